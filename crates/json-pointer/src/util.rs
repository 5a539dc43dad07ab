/// Unescapes a pointer component: `~1` becomes `/`, `~0` becomes `~`.
///
/// ```
/// use deckscribe_json_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a pointer component: `~` becomes `~0`, `/` becomes `~1`.
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parses a pointer string into its unescaped steps.
///
/// The empty string is the root. The leading `/` is dropped, so `"/"`
/// addresses the key `""`.
///
/// ```
/// use deckscribe_json_pointer::parse_json_pointer;
///
/// assert_eq!(parse_json_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_json_pointer("/"), vec![""]);
/// assert_eq!(parse_json_pointer("/name"), vec!["name"]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    let rest = pointer.strip_prefix('/').unwrap_or(pointer);
    rest.split('/').map(unescape_component).collect()
}

/// Formats steps back into a pointer string. The root formats as `""`.
pub fn format_json_pointer(path: &[String]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component));
    }
    out
}

pub fn is_root(path: &[String]) -> bool {
    path.is_empty()
}

/// True when `child` lies strictly below `parent`.
///
/// ```
/// use deckscribe_json_pointer::is_child;
///
/// let files = vec!["files".to_string()];
/// let card = vec!["files".to_string(), "card.png".to_string()];
/// assert!(is_child(&files, &card));
/// assert!(!is_child(&card, &files));
/// assert!(!is_child(&files, &files));
/// ```
pub fn is_child(parent: &[String], child: &[String]) -> bool {
    parent.len() < child.len() && child[..parent.len()] == *parent
}

/// Splits a path into its parent path and final step.
pub fn split_last(path: &[String]) -> Option<(&[String], &String)> {
    path.split_last().map(|(last, head)| (head, last))
}

/// True for canonical decimal array indices (`"0"`, `"12"`, not `"01"`).
pub fn is_valid_index(index: &str) -> bool {
    let bytes = index.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(u8::is_ascii_digit)
}
