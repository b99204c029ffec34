// src/utils/html.rs

/// Strips unsafe markup from question prompts before they are stored, keeping
/// harmless formatting tags such as <b> or <p>. The result is an HTML
/// fragment, so a bare `<` comes back escaped.
///
/// Topics and model answers do not go through here: they are plain text
/// compared or grouped verbatim.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_scripts_keeps_text() {
        let cleaned = clean_html("What is <b>2+2</b>?<script>alert(1)</script>");
        assert_eq!(cleaned, "What is <b>2+2</b>?");
    }
}
