//! Path canonicalization that neutralizes directory traversal.
//!
//! This is not path resolution. It runs one left-to-right pass that:
//!
//! - collapses runs of `/` and `\` into a single `/` (a lone `\` is kept
//!   unless it directly follows an emitted `/`);
//! - strips dot pairs from a run of `.` that directly follows an emitted `/`,
//!   so `/..` becomes `/` and `/...` becomes `/.`.
//!
//! Dot runs that are not preceded by a separator (including at the very
//! start) are left alone. The result is stable: sanitizing twice gives the
//! same bytes as sanitizing once.

fn is_separator(b: u8) -> bool {
    b == b'/' || b == b'\\'
}

/// Sanitizes `path` in place.
pub fn sanitize_path(path: &mut Vec<u8>) {
    let len = path.len();
    let mut read = 0;
    let mut write = 0;

    while read < len {
        let b = path[read];

        if is_separator(b) {
            let start = read;
            while read < len && is_separator(path[read]) {
                read += 1;
            }
            let run = read - start;
            let after_slash = write > 0 && path[write - 1] == b'/';

            if after_slash {
                // merges into the separator already emitted
            } else if run >= 2 {
                path[write] = b'/';
                write += 1;
            } else {
                path[write] = b;
                write += 1;
            }
            continue;
        }

        if b == b'.' && write > 0 && path[write - 1] == b'/' {
            let start = read;
            while read < len && path[read] == b'.' {
                read += 1;
            }
            if (read - start) % 2 == 1 {
                path[write] = b'.';
                write += 1;
            }
            continue;
        }

        path[write] = b;
        write += 1;
        read += 1;
    }

    path.truncate(write);
}

/// Returns a sanitized copy of `path`.
pub fn sanitize_path_str(path: &str) -> String {
    let mut bytes = path.as_bytes().to_vec();
    sanitize_path(&mut bytes);
    // only ASCII bytes are removed or rewritten, so this stays valid UTF-8
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_flattened() {
        assert_eq!(sanitize_path_str("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(sanitize_path_str("/a/..\\..\\b"), "/a/b");
    }

    #[test]
    fn write_cursor_never_passes_read_cursor() {
        let mut p = b"//..//..//".to_vec();
        sanitize_path(&mut p);
        assert_eq!(p, b"/");
    }
}
