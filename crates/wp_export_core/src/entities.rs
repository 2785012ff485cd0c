/// Decodes HTML character references in rendered text, e.g. `&#65;` -> `A`,
/// `&#8217;` -> `’` and `&amp;` -> `&`.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
