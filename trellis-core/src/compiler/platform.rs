//! Web platform tag tables.

use std::collections::HashSet;
use std::sync::LazyLock;

fn make_set(list: &'static str) -> HashSet<&'static str> {
    list.split(',').collect()
}

static HTML_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    make_set(
        "html,body,base,head,link,meta,style,title,\
         address,article,aside,footer,header,h1,h2,h3,h4,h5,h6,hgroup,nav,section,\
         div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,ul,\
         a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,rtc,ruby,\
         s,samp,small,span,strong,sub,sup,time,u,var,wbr,area,audio,map,track,video,\
         embed,object,param,source,canvas,script,noscript,del,ins,\
         caption,col,colgroup,table,thead,tbody,td,th,tr,\
         button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
         output,progress,select,textarea,\
         details,dialog,menu,menuitem,summary,\
         content,element,shadow,template,blockquote,iframe,tfoot",
    )
});

// Only the svg tags that may contain child elements.
static SVG_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    make_set(
        "svg,animate,circle,clippath,cursor,defs,desc,ellipse,filter,font-face,\
         foreignobject,g,glyph,image,line,marker,mask,missing-glyph,path,pattern,\
         polygon,polyline,rect,switch,symbol,text,textpath,tspan,use,view",
    )
});

static UNARY_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    make_set(
        "area,base,br,col,embed,frame,hr,img,input,isindex,keygen,\
         link,meta,param,source,track,wbr",
    )
});

// Elements that close themselves when their parent closes.
static LEFT_OPEN_TAGS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| make_set("colgroup,dd,dt,li,options,p,td,tfoot,th,thead,tr,source"));

static NON_PHRASING_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    make_set(
        "address,article,aside,base,blockquote,body,caption,col,colgroup,dd,\
         details,dialog,div,dl,dt,fieldset,figcaption,figure,footer,form,\
         h1,h2,h3,h4,h5,h6,head,header,hgroup,hr,html,legend,li,menuitem,meta,\
         optgroup,option,param,rp,rt,source,style,summary,tbody,td,tfoot,th,thead,\
         title,tr,track",
    )
});

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag)
}

pub fn is_svg(tag: &str) -> bool {
    SVG_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

/// Platform elements, as opposed to components.
pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg(tag)
}

pub fn is_unary_tag(tag: &str) -> bool {
    UNARY_TAGS.contains(tag)
}

pub fn can_be_left_open_tag(tag: &str) -> bool {
    LEFT_OPEN_TAGS.contains(tag)
}

pub fn is_non_phrasing_tag(tag: &str) -> bool {
    NON_PHRASING_TAGS.contains(tag)
}

pub fn is_pre_tag(tag: &str) -> bool {
    tag == "pre"
}

/// Built-in abstract tags that are never static.
pub fn is_built_in_tag(tag: &str) -> bool {
    matches!(tag, "slot" | "component")
}

pub fn get_tag_namespace(tag: &str) -> Option<String> {
    if is_svg(tag) {
        Some("svg".to_string())
    } else if tag == "math" {
        Some("math".to_string())
    } else {
        None
    }
}

/// Whether binding `attr` on `tag` must set a DOM property rather than an
/// attribute.
pub fn must_use_prop(tag: &str, ty: Option<&str>, attr: &str) -> bool {
    let accept_value = matches!(tag, "input" | "textarea" | "option" | "select" | "progress");
    (attr == "value" && accept_value && ty != Some("button"))
        || (attr == "selected" && tag == "option")
        || (attr == "checked" && tag == "input")
        || (attr == "muted" && tag == "video")
}
