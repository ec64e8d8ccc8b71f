//! HTML pages of the simple index.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::link::Link;

const INDEX_HEADER: &str = "<html><head><title>Simple Index</title><meta name=\"api-version\" value=\"2\" /></head><body>\n";
const FOOTER: &str = "</body></html>\n";

fn anchor(out: &mut String, href: &str, text: &str) {
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "<a href=\"{}\">{}</a><br/>",
        encode_double_quoted_attribute(href),
        encode_text(text)
    );
}

/// One anchor per package name, in the given order.
pub fn index_page<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::from(INDEX_HEADER);
    for name in names {
        anchor(&mut out, name, name);
    }
    out.push_str(FOOTER);
    out
}

/// One anchor per link: `href` is the URL, the text is the link name.
pub fn package_page(name: &str, links: &[Link]) -> String {
    let name = encode_text(name);
    let mut out = format!(
        "<!DOCTYPE html><html><head><title>Links for {name}</title></head><body><h1>Links for {name}</h1>\n"
    );
    for link in links {
        anchor(&mut out, link.url(), link.name());
    }
    out.push_str(FOOTER);
    out
}

pub fn not_found_page(requested: &str) -> String {
    format!(
        "<html><body> Package <b>{}</b> does not exist.</body></html>\n",
        encode_text(requested)
    )
}

pub fn source_error_page(name: &str) -> String {
    format!(
        "<html><body> Failed to list links for <b>{}</b>.</body></html>\n",
        encode_text(name)
    )
}
