/// Strips unsafe markup from text that other users will see
/// (question and option text, exam and material descriptions, notifications).
///
/// Whitelist based: harmless tags such as <b> survive, <script> is removed
/// together with its content.
///
/// The result is HTML, not plain text: a bare `&` or `<` comes back as an
/// entity (`A & B` is stored as `A &amp; B`), so clients must render these
/// fields as markup rather than print them verbatim.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}
