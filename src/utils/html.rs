use ammonia;

/// Clean user-authored text using the ammonia library.
///
/// Survey titles, descriptions, question/option text and free-text answers
/// are all echoed back to other users' browsers, so everything passes
/// through whitelist-based sanitization before it reaches storage.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input)
}
