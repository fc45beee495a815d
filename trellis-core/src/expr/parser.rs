//! Expression front end.
//!
//! Source is parsed by `oxc_parser` as a sloppy-mode script (render source
//! uses `with (this)`) and lowered into the owned [`ast`](super::ast) the
//! evaluator walks. The oxc tree lives in a per-call arena and never escapes
//! this module.
//!
//! Lowering rejects constructs the evaluator cannot run (classes, `new`,
//! `delete`, loops, generators) with [`EvalError::Unsupported`], so the
//! compiler can report them against the template.

use std::sync::Arc;

use oxc_allocator::Allocator;
use oxc_ast::ast as js;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType};

use super::ast::*;
use crate::error::EvalError;
use crate::value::format_number;

/// Words that can never be plain identifiers.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in", "instanceof",
    "let", "new", "return", "super", "switch", "throw", "try", "var", "while", "with", "yield",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn parser<'a>(allocator: &'a Allocator, src: &'a str) -> Parser<'a> {
    Parser::new(allocator, src, SourceType::cjs()).with_options(ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    })
}

/// Parse a statement list.
pub fn parse_program(src: &str) -> Result<Program, EvalError> {
    let allocator = Allocator::default();
    let ret = parser(&allocator, src).parse();
    if let Some(error) = ret.errors.first() {
        return Err(syntax_error(error, 0));
    }
    Ok(Program {
        body: lower_stmts(&ret.program.body)?,
    })
}

/// Parse a single expression (the comma operator is allowed).
pub fn parse_expression(src: &str) -> Result<Expr, EvalError> {
    let allocator = Allocator::default();
    let expr = parse_whole_expression(&allocator, src, 0)?;
    lower_expr(&expr)
}

/// Parse a comma separated parameter list, as written between the parens
/// of a function.
pub fn parse_params(src: &str) -> Result<Vec<Param>, EvalError> {
    let allocator = Allocator::default();
    let wrapped = format!("({src}) => {{}}");
    let expr = parse_whole_expression(&allocator, &wrapped, 1)?;
    match expr {
        js::Expression::ArrowFunctionExpression(arrow) => lower_params(&arrow.params),
        _ => Err(EvalError::Syntax {
            message: "expected a parameter list".into(),
            offset: 0,
        }),
    }
}

/// Parse `src` as one expression and reject anything left over after it.
/// `shift` is subtracted from reported offsets when `src` wraps the
/// caller's text.
fn parse_whole_expression<'a>(
    allocator: &'a Allocator,
    src: &'a str,
    shift: usize,
) -> Result<js::Expression<'a>, EvalError> {
    let expr = parser(allocator, src)
        .parse_expression()
        .map_err(|errors| match errors.first() {
            Some(error) => syntax_error(error, shift),
            None => EvalError::Syntax {
                message: "invalid expression".into(),
                offset: 0,
            },
        })?;
    let end = expr.span().end as usize;
    if !src.get(end..).unwrap_or_default().trim().is_empty() {
        return Err(EvalError::Syntax {
            message: "expected end of input".into(),
            offset: end.saturating_sub(shift),
        });
    }
    Ok(expr)
}

fn syntax_error(error: &OxcDiagnostic, shift: usize) -> EvalError {
    let offset = error
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map_or(0, |label| label.offset());
    EvalError::Syntax {
        message: error.message.to_string(),
        offset: offset.saturating_sub(shift),
    }
}

fn unsupported(what: &str) -> EvalError {
    EvalError::Unsupported(what.to_string())
}

// Statements

fn lower_stmts(stmts: &[js::Statement<'_>]) -> Result<Vec<Stmt>, EvalError> {
    stmts.iter().map(lower_stmt).collect()
}

fn lower_stmt(stmt: &js::Statement<'_>) -> Result<Stmt, EvalError> {
    Ok(match stmt {
        js::Statement::ExpressionStatement(s) => Stmt::Expr(lower_expr(&s.expression)?),
        js::Statement::ReturnStatement(s) => {
            Stmt::Return(s.argument.as_ref().map(lower_expr).transpose()?)
        }
        js::Statement::IfStatement(s) => Stmt::If {
            test: lower_expr(&s.test)?,
            consequent: Box::new(lower_stmt(&s.consequent)?),
            alternate: s
                .alternate
                .as_ref()
                .map(|alt| lower_stmt(alt).map(Box::new))
                .transpose()?,
        },
        js::Statement::BlockStatement(s) => Stmt::Block(lower_stmts(&s.body)?),
        js::Statement::EmptyStatement(_) => Stmt::Empty,
        js::Statement::VariableDeclaration(decl) => {
            let mut decls = Vec::with_capacity(decl.declarations.len());
            for declarator in &decl.declarations {
                let js::BindingPattern::BindingIdentifier(id) = &declarator.id else {
                    return Err(unsupported("destructuring declarations"));
                };
                let init = declarator.init.as_ref().map(lower_expr).transpose()?;
                decls.push((id.name.to_string(), init));
            }
            Stmt::Var(decls)
        }
        js::Statement::FunctionDeclaration(f) => {
            let name = f.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
            Stmt::Var(vec![(name, Some(lower_function(f)?))])
        }
        // Names already resolve through the instance.
        js::Statement::WithStatement(s) => match &s.object {
            js::Expression::ThisExpression(_) => lower_stmt(&s.body)?,
            _ => return Err(unsupported("'with' on anything but 'this'")),
        },
        js::Statement::ForStatement(_)
        | js::Statement::ForInStatement(_)
        | js::Statement::ForOfStatement(_)
        | js::Statement::WhileStatement(_)
        | js::Statement::DoWhileStatement(_) => return Err(unsupported("loops")),
        js::Statement::ThrowStatement(_) | js::Statement::TryStatement(_) => {
            return Err(unsupported("exceptions"))
        }
        _ => return Err(unsupported("statement")),
    })
}

// Expressions

fn lower_expr(expr: &js::Expression<'_>) -> Result<Expr, EvalError> {
    Ok(match expr {
        js::Expression::BooleanLiteral(lit) => Expr::Literal(Literal::Bool(lit.value)),
        js::Expression::NullLiteral(_) => Expr::Literal(Literal::Null),
        js::Expression::NumericLiteral(lit) => Expr::Literal(Literal::Number(lit.value)),
        js::Expression::StringLiteral(lit) => Expr::str(lit.value.as_str()),
        js::Expression::TemplateLiteral(tpl) => lower_template(tpl)?,
        js::Expression::Identifier(id) => match id.name.as_str() {
            "undefined" => Expr::Literal(Literal::Undefined),
            name => Expr::Ident(name.to_string()),
        },
        js::Expression::ThisExpression(_) => Expr::This,
        js::Expression::ParenthesizedExpression(paren) => lower_expr(&paren.expression)?,
        js::Expression::ArrayExpression(array) => {
            let mut items = Vec::with_capacity(array.elements.len());
            for element in &array.elements {
                items.push(match element {
                    js::ArrayExpressionElement::SpreadElement(spread) => {
                        Expr::Spread(Box::new(lower_expr(&spread.argument)?))
                    }
                    js::ArrayExpressionElement::Elision(_) => Expr::Literal(Literal::Undefined),
                    other => lower_expr(other.to_expression())?,
                });
            }
            Expr::Array(items)
        }
        js::Expression::ObjectExpression(object) => lower_object(object)?,
        js::Expression::StaticMemberExpression(m) => lower_static_member(m)?,
        js::Expression::ComputedMemberExpression(m) => lower_computed_member(m)?,
        js::Expression::CallExpression(call) => lower_call(call)?,
        js::Expression::ChainExpression(chain) => match &chain.expression {
            js::ChainElement::CallExpression(call) => lower_call(call)?,
            js::ChainElement::StaticMemberExpression(m) => lower_static_member(m)?,
            js::ChainElement::ComputedMemberExpression(m) => lower_computed_member(m)?,
            _ => return Err(unsupported("optional chain")),
        },
        js::Expression::UnaryExpression(unary) => {
            let op = match unary.operator {
                js::UnaryOperator::LogicalNot => UnaryOp::Not,
                js::UnaryOperator::UnaryNegation => UnaryOp::Neg,
                js::UnaryOperator::UnaryPlus => UnaryOp::Plus,
                js::UnaryOperator::Typeof => UnaryOp::TypeOf,
                js::UnaryOperator::Void => UnaryOp::Void,
                other => return Err(unsupported(&format!("'{}'", other.as_str()))),
            };
            Expr::Unary {
                op,
                operand: Box::new(lower_expr(&unary.argument)?),
            }
        }
        js::Expression::UpdateExpression(update) => Expr::Update {
            increment: matches!(update.operator, js::UpdateOperator::Increment),
            prefix: update.prefix,
            target: Box::new(lower_simple_target(&update.argument)?),
        },
        js::Expression::BinaryExpression(binary) => {
            let op = match binary.operator {
                js::BinaryOperator::Addition => BinaryOp::Add,
                js::BinaryOperator::Subtraction => BinaryOp::Sub,
                js::BinaryOperator::Multiplication => BinaryOp::Mul,
                js::BinaryOperator::Division => BinaryOp::Div,
                js::BinaryOperator::Remainder => BinaryOp::Rem,
                js::BinaryOperator::Exponential => BinaryOp::Exp,
                js::BinaryOperator::Equality => BinaryOp::Eq,
                js::BinaryOperator::Inequality => BinaryOp::NotEq,
                js::BinaryOperator::StrictEquality => BinaryOp::StrictEq,
                js::BinaryOperator::StrictInequality => BinaryOp::StrictNotEq,
                js::BinaryOperator::LessThan => BinaryOp::Lt,
                js::BinaryOperator::GreaterThan => BinaryOp::Gt,
                js::BinaryOperator::LessEqualThan => BinaryOp::LtEq,
                js::BinaryOperator::GreaterEqualThan => BinaryOp::GtEq,
                js::BinaryOperator::In => BinaryOp::In,
                other => return Err(unsupported(&format!("'{}' operator", other.as_str()))),
            };
            Expr::Binary {
                op,
                left: Box::new(lower_expr(&binary.left)?),
                right: Box::new(lower_expr(&binary.right)?),
            }
        }
        js::Expression::LogicalExpression(logical) => Expr::Logical {
            op: match logical.operator {
                js::LogicalOperator::And => LogicalOp::And,
                js::LogicalOperator::Or => LogicalOp::Or,
                js::LogicalOperator::Coalesce => LogicalOp::Nullish,
            },
            left: Box::new(lower_expr(&logical.left)?),
            right: Box::new(lower_expr(&logical.right)?),
        },
        js::Expression::ConditionalExpression(cond) => Expr::Conditional {
            test: Box::new(lower_expr(&cond.test)?),
            consequent: Box::new(lower_expr(&cond.consequent)?),
            alternate: Box::new(lower_expr(&cond.alternate)?),
        },
        js::Expression::AssignmentExpression(assign) => {
            let op = match assign.operator {
                js::AssignmentOperator::Assign => AssignOp::Assign,
                js::AssignmentOperator::Addition => AssignOp::Add,
                js::AssignmentOperator::Subtraction => AssignOp::Sub,
                js::AssignmentOperator::Multiplication => AssignOp::Mul,
                js::AssignmentOperator::Division => AssignOp::Div,
                js::AssignmentOperator::Remainder => AssignOp::Rem,
                js::AssignmentOperator::Exponential => AssignOp::Exp,
                other => return Err(unsupported(&format!("'{}' assignment", other.as_str()))),
            };
            Expr::Assign {
                op,
                target: Box::new(lower_target(&assign.left)?),
                value: Box::new(lower_expr(&assign.right)?),
            }
        }
        js::Expression::SequenceExpression(seq) => Expr::Sequence(
            seq.expressions
                .iter()
                .map(lower_expr)
                .collect::<Result<_, _>>()?,
        ),
        js::Expression::ArrowFunctionExpression(arrow) => {
            if arrow.r#async {
                return Err(unsupported("async functions"));
            }
            let params = lower_params(&arrow.params)?;
            let body = match arrow.body.statements.first() {
                Some(js::Statement::ExpressionStatement(s)) if arrow.expression => {
                    FunctionBody::Expr(lower_expr(&s.expression)?)
                }
                _ => FunctionBody::Block(lower_stmts(&arrow.body.statements)?),
            };
            Expr::Function(Arc::new(FunctionDef { params, body }))
        }
        js::Expression::FunctionExpression(f) => lower_function(f)?,
        js::Expression::NewExpression(_) => return Err(unsupported("'new'")),
        js::Expression::ClassExpression(_) => return Err(unsupported("classes")),
        js::Expression::TaggedTemplateExpression(_) => {
            return Err(unsupported("tagged templates"))
        }
        js::Expression::RegExpLiteral(_) => return Err(unsupported("regular expressions")),
        js::Expression::BigIntLiteral(_) => return Err(unsupported("bigint literals")),
        js::Expression::AwaitExpression(_) | js::Expression::YieldExpression(_) => {
            return Err(unsupported("'await' and 'yield'"))
        }
        _ => return Err(unsupported("expression")),
    })
}

fn lower_template(tpl: &js::TemplateLiteral<'_>) -> Result<Expr, EvalError> {
    let quasis = tpl
        .quasis
        .iter()
        .map(|quasi| {
            let text = quasi.value.cooked.unwrap_or(quasi.value.raw);
            Arc::from(text.as_str())
        })
        .collect();
    let exprs = tpl
        .expressions
        .iter()
        .map(lower_expr)
        .collect::<Result<_, _>>()?;
    Ok(Expr::Template { quasis, exprs })
}

fn lower_object(object: &js::ObjectExpression<'_>) -> Result<Expr, EvalError> {
    let mut props = Vec::with_capacity(object.properties.len());
    for property in &object.properties {
        let prop = match property {
            js::ObjectPropertyKind::SpreadProperty(spread) => {
                (PropKey::Spread, lower_expr(&spread.argument)?)
            }
            js::ObjectPropertyKind::ObjectProperty(prop) => {
                if !matches!(prop.kind, js::PropertyKind::Init) {
                    return Err(unsupported("getters and setters"));
                }
                (lower_key(&prop.key, prop.computed)?, lower_expr(&prop.value)?)
            }
        };
        props.push(prop);
    }
    Ok(Expr::Object(props))
}

fn lower_key(key: &js::PropertyKey<'_>, computed: bool) -> Result<PropKey, EvalError> {
    if computed {
        return match key.as_expression() {
            Some(expr) => Ok(PropKey::Computed(lower_expr(expr)?)),
            None => Err(unsupported("private names")),
        };
    }
    match static_key(key) {
        Some(name) => Ok(PropKey::Static(name)),
        None => Err(unsupported("property key")),
    }
}

fn static_key(key: &js::PropertyKey<'_>) -> Option<String> {
    match key {
        js::PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        js::PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        js::PropertyKey::NumericLiteral(lit) => Some(format_number(lit.value)),
        _ => None,
    }
}

fn lower_static_member(m: &js::StaticMemberExpression<'_>) -> Result<Expr, EvalError> {
    Ok(member(
        lower_expr(&m.object)?,
        Expr::str(m.property.name.as_str()),
        m.optional,
    ))
}

fn lower_computed_member(m: &js::ComputedMemberExpression<'_>) -> Result<Expr, EvalError> {
    Ok(member(lower_expr(&m.object)?, lower_expr(&m.expression)?, m.optional))
}

fn lower_call(call: &js::CallExpression<'_>) -> Result<Expr, EvalError> {
    let mut args = Vec::with_capacity(call.arguments.len());
    for argument in &call.arguments {
        args.push(match argument {
            js::Argument::SpreadElement(spread) => {
                Expr::Spread(Box::new(lower_expr(&spread.argument)?))
            }
            other => lower_expr(other.to_expression())?,
        });
    }
    Ok(Expr::Call {
        callee: Box::new(lower_expr(&call.callee)?),
        args,
        optional: call.optional,
    })
}

fn lower_target(target: &js::AssignmentTarget<'_>) -> Result<Expr, EvalError> {
    match target.as_simple_assignment_target() {
        Some(simple) => lower_simple_target(simple),
        None => Err(unsupported("destructuring assignment")),
    }
}

fn lower_simple_target(target: &js::SimpleAssignmentTarget<'_>) -> Result<Expr, EvalError> {
    match target {
        js::SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
            Ok(Expr::Ident(id.name.to_string()))
        }
        js::SimpleAssignmentTarget::StaticMemberExpression(m) => lower_static_member(m),
        js::SimpleAssignmentTarget::ComputedMemberExpression(m) => lower_computed_member(m),
        _ => Err(EvalError::InvalidAssignment("expression".into())),
    }
}

fn lower_function(f: &js::Function<'_>) -> Result<Expr, EvalError> {
    if f.r#async || f.generator {
        return Err(unsupported("async and generator functions"));
    }
    let params = lower_params(&f.params)?;
    let body = match &f.body {
        Some(body) => lower_stmts(&body.statements)?,
        None => Vec::new(),
    };
    Ok(Expr::Function(Arc::new(FunctionDef {
        params,
        body: FunctionBody::Block(body),
    })))
}

// Parameters

fn lower_params(params: &js::FormalParameters<'_>) -> Result<Vec<Param>, EvalError> {
    let mut out = Vec::with_capacity(params.items.len() + 1);
    for item in &params.items {
        let param = lower_pattern(&item.pattern)?;
        out.push(match &item.initializer {
            Some(default) => Param::Default(Box::new(param), lower_expr(default)?),
            None => param,
        });
    }
    if let Some(rest) = &params.rest {
        match &rest.rest.argument {
            js::BindingPattern::BindingIdentifier(id) => out.push(Param::Rest(id.name.to_string())),
            _ => return Err(unsupported("destructuring rest parameters")),
        }
    }
    Ok(out)
}

fn lower_pattern(pattern: &js::BindingPattern<'_>) -> Result<Param, EvalError> {
    match pattern {
        js::BindingPattern::BindingIdentifier(id) => Ok(Param::Ident(id.name.to_string())),
        js::BindingPattern::AssignmentPattern(assign) => Ok(Param::Default(
            Box::new(lower_pattern(&assign.left)?),
            lower_expr(&assign.right)?,
        )),
        js::BindingPattern::ObjectPattern(object) => {
            if object.rest.is_some() {
                return Err(unsupported("object rest patterns"));
            }
            let mut pairs = Vec::with_capacity(object.properties.len());
            for prop in &object.properties {
                let key = (!prop.computed)
                    .then(|| static_key(&prop.key))
                    .flatten()
                    .ok_or_else(|| unsupported("computed pattern keys"))?;
                pairs.push((key, binding_name(&prop.value)?));
            }
            Ok(Param::Object(pairs))
        }
        js::BindingPattern::ArrayPattern(array) => {
            if array.rest.is_some() {
                return Err(unsupported("array rest patterns"));
            }
            let mut names = Vec::with_capacity(array.elements.len());
            for element in &array.elements {
                match element {
                    Some(pattern) => names.push(binding_name(pattern)?),
                    None => return Err(unsupported("holes in array patterns")),
                }
            }
            Ok(Param::Array(names))
        }
    }
}

fn binding_name(pattern: &js::BindingPattern<'_>) -> Result<String, EvalError> {
    match pattern {
        js::BindingPattern::BindingIdentifier(id) => Ok(id.name.to_string()),
        _ => Err(unsupported("nested destructuring")),
    }
}

fn member(object: Expr, property: Expr, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: Box::new(property),
        optional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.into()))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expression("a + b * c").unwrap();
        let Expr::Binary { op: BinaryOp::Add, right, .. } = expr else {
            panic!("expected addition at the root");
        };
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn ternary_and_logical() {
        let expr = parse_expression("ok && ready ? 'yes' : 'no'").unwrap();
        let Expr::Conditional { test, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*test, Expr::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn member_and_call_chain() {
        let expr = parse_expression("list.items[0].name.toUpperCase()").unwrap();
        assert!(matches!(expr, Expr::Call { optional: false, .. }));
    }

    #[test]
    fn optional_chains_keep_their_flags() {
        let expr = parse_expression("user?.profile?.name").unwrap();
        assert!(matches!(expr, Expr::Member { optional: true, .. }));
        let expr = parse_expression("cb?.()").unwrap();
        assert!(matches!(expr, Expr::Call { optional: true, .. }));
    }

    #[test]
    fn parentheses_only_group() {
        let expr = parse_expression("(a + b) * c").unwrap();
        let Expr::Binary { op: BinaryOp::Mul, left, .. } = expr else {
            panic!("expected multiplication at the root");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn arrow_functions() {
        let expr = parse_expression("(item, i) => item + i").unwrap();
        let Expr::Function(def) = expr else {
            panic!("expected function");
        };
        assert_eq!(def.params.len(), 2);
        assert!(matches!(def.body, FunctionBody::Expr(_)));

        let expr = parse_expression("x => x").unwrap();
        assert!(matches!(expr, Expr::Function(_)));

        let expr = parse_expression("x => { return x }").unwrap();
        let Expr::Function(def) = expr else {
            panic!("expected function");
        };
        assert!(matches!(def.body, FunctionBody::Block(_)));
    }

    #[test]
    fn template_literals() {
        let expr = parse_expression("`Hello ${user.name}, you have ${n} new`").unwrap();
        let Expr::Template { quasis, exprs } = expr else {
            panic!("expected template");
        };
        let quasis: Vec<&str> = quasis.iter().map(|q| &**q).collect();
        assert_eq!(quasis, vec!["Hello ", ", you have ", " new"]);
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1], Expr::Ident("n".into()));

        let Expr::Template { quasis, exprs } = parse_expression("`line\\n`").unwrap() else {
            panic!("expected template");
        };
        assert_eq!(&*quasis[0], "line\n");
        assert!(exprs.is_empty());
    }

    #[test]
    fn spread_in_lists_and_objects() {
        let Expr::Array(items) = parse_expression("[0, ...rest]").unwrap() else {
            panic!("expected array");
        };
        assert_eq!(items[1], Expr::Spread(ident("rest")));

        let Expr::Call { args, .. } = parse_expression("f(...args)").unwrap() else {
            panic!("expected call");
        };
        assert_eq!(args, vec![Expr::Spread(ident("args"))]);

        let Expr::Object(props) = parse_expression("{ ...base, a: 1 }").unwrap() else {
            panic!("expected object");
        };
        assert_eq!(props[0], (PropKey::Spread, Expr::Ident("base".into())));
    }

    #[test]
    fn default_and_rest_parameters() {
        let params = parse_params("a = 1, ...rest").unwrap();
        assert_eq!(
            params,
            vec![
                Param::Default(
                    Box::new(Param::Ident("a".into())),
                    Expr::Literal(Literal::Number(1.0))
                ),
                Param::Rest("rest".into()),
            ]
        );
        assert_eq!(params[1].bindings(), vec!["rest"]);
    }

    #[test]
    fn destructuring_params() {
        let params = parse_params("{ item, index: i }, [a, b]").unwrap();
        assert_eq!(
            params,
            vec![
                Param::Object(vec![("item".into(), "item".into()), ("index".into(), "i".into())]),
                Param::Array(vec!["a".into(), "b".into()]),
            ]
        );
    }

    #[test]
    fn params_cannot_escape_the_list() {
        assert!(parse_params("a) => 0, (b").is_err());
        assert!(parse_params("{ x ").is_err());
        assert!(parse_params("").unwrap().is_empty());
    }

    #[test]
    fn render_body_program() {
        let program = parse_program("with(this){return _c('div',[_v(_s(msg))])}").unwrap();
        let Stmt::Block(body) = &program.body[0] else {
            panic!("expected block");
        };
        assert!(matches!(body[0], Stmt::Return(Some(Expr::Call { .. }))));
    }

    #[test]
    fn handler_statements() {
        let program = parse_program(
            "return function($event){if(!$event.type.indexOf('key'))return null;count++}",
        )
        .unwrap();
        assert_eq!(program.body.len(), 1);
        let Stmt::Return(Some(Expr::Function(def))) = &program.body[0] else {
            panic!("expected returned function");
        };
        let FunctionBody::Block(body) = &def.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0], Stmt::If { .. }));
    }

    #[test]
    fn object_literal_forms() {
        let expr = parse_expression("{a: 1, 'b-c': 2, [key]: 3, d}").unwrap();
        let Expr::Object(props) = expr else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 4);
        assert_eq!(props[1].0, PropKey::Static("b-c".into()));
        assert_eq!(props[3], (PropKey::Static("d".into()), Expr::Ident("d".into())));
    }

    #[test]
    fn assignment_requires_a_target() {
        assert!(parse_expression("a = 1").is_ok());
        assert!(parse_expression("a.b += 1").is_ok());
        assert!(parse_expression("a **= 2").is_ok());
        assert!(matches!(
            parse_expression("1 = a"),
            Err(EvalError::Syntax { .. })
        ));
    }

    #[test]
    fn unsupported_and_invalid_forms_are_rejected() {
        assert!(matches!(parse_expression("delete a.b"), Err(EvalError::Unsupported(_))));
        assert!(matches!(parse_expression("new Date()"), Err(EvalError::Unsupported(_))));
        assert!(parse_expression("if").is_err());
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_program("for (;;) {}").is_err());
    }

    #[test]
    fn syntax_errors_carry_an_offset() {
        let Err(EvalError::Syntax { offset, .. }) = parse_expression("a + + ") else {
            panic!("expected a syntax error");
        };
        assert!(offset >= 4);
    }

    #[test]
    fn in_operator() {
        let expr = parse_expression("'button' in $event").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::In,
                left: Box::new(Expr::str("button")),
                right: ident("$event"),
            }
        );
    }
}
