use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags survive, <script>/<iframe> and
/// event-handler attributes are stripped. Contact messages pass through this
/// before being stored, since the admin panel renders them back.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
