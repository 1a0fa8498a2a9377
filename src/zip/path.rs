/// Normalize an in-archive path.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..`
/// removes the previously kept segment (it cannot climb above the archive
/// root). Returns `None` when nothing is left.
pub fn sanitize(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");

    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            s => kept.push(s),
        }
    }

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_parent_segments() {
        assert_eq!(sanitize("..\\a\\..\\b.txt").as_deref(), Some("b.txt"));
        assert_eq!(sanitize("a/b/../../c/d").as_deref(), Some("c/d"));
    }

    #[test]
    fn trims_and_collapses() {
        assert_eq!(sanitize("/dir//./file.txt/").as_deref(), Some("dir/file.txt"));
        assert_eq!(sanitize("plain.txt").as_deref(), Some("plain.txt"));
    }

    #[test]
    fn empty_results_are_rejected() {
        assert_eq!(sanitize("/././"), None);
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("a/.."), None);
    }
}
