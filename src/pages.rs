// 📄 Pages - the front-desk views
//
// Templates are compiled into the binary and filled with `{{ name }}`
// placeholders. Every substituted value is HTML-escaped.

pub struct PageRoute {
    pub path: &'static str,
    pub view: &'static str,
    pub title: &'static str,
}

pub const ROUTES: &[PageRoute] = &[
    PageRoute { path: "/", view: "index", title: "Home" },
    PageRoute { path: "/pageTwo", view: "pageTwo", title: "Page 2" },
    PageRoute { path: "/pageThree", view: "pageThree", title: "Page 3" },
    PageRoute { path: "/pageFour", view: "pageFour", title: "Page 4" },
];

/// Section tag every page is rendered with
pub const PAGE_SECTION: &str = "register";

pub fn template(view: &str) -> Option<&'static str> {
    match view {
        "index" => Some(include_str!("../templates/index.html")),
        "pageTwo" => Some(include_str!("../templates/pageTwo.html")),
        "pageThree" => Some(include_str!("../templates/pageThree.html")),
        "pageFour" => Some(include_str!("../templates/pageFour.html")),
        "error" => Some(include_str!("../templates/error.html")),
        _ => None,
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Substitute `{{ key }}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |html, (key, value)| {
        html.replace(&format!("{{{{ {key} }}}}"), &escape_html(value))
    })
}

pub fn render_page(route: &PageRoute, lang: &str) -> String {
    let html = template(route.view).unwrap_or_default();
    render(
        html,
        &[("title", route.title), ("lang", lang), ("page", PAGE_SECTION)],
    )
}

pub fn render_error(status: u16, message: &str) -> String {
    let html = template("error").unwrap_or_default();
    render(
        html,
        &[("title", "error"), ("status", &status.to_string()), ("message", message)],
    )
}
