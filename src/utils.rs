use std::fs::{self, DirBuilder};
use std::io;
use std::path::{Path, PathBuf};

/// Creates a directory if it doesn't exist
pub fn ensure_dir(path: impl AsRef<Path>) -> io::Result<()> {
    DirBuilder::new()
        .recursive(true)
        .create(path)
}

/// Splits text into chunks of at most `max_chars` characters, preferring
/// sentence boundaries. Sentences longer than `max_chars` are cut hard.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current_chunk = String::new();
    let mut current_length = 0;

    for sentence in text.split_inclusive(['.', '!', '?']) {
        let sentence = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
        if sentence.is_empty() {
            continue;
        }

        for piece in hard_split(&sentence, max_chars) {
            let piece_len = piece.chars().count();
            let separator = usize::from(!current_chunk.is_empty());
            if current_length + separator + piece_len > max_chars && !current_chunk.is_empty() {
                chunks.push(std::mem::take(&mut current_chunk));
                current_length = 0;
            }

            if !current_chunk.is_empty() {
                current_chunk.push(' ');
                current_length += 1;
            }
            current_chunk.push_str(piece.trim());
            current_length += piece.trim().chars().count();
        }
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect::<String>())
        .filter(|piece| !piece.trim().is_empty())
        .collect()
}

/// Lists files under `dir_path` recursively whose extension is one of `exts`
/// (compared case-insensitively, without the leading dot). Sorted by path.
pub fn collect_files(dir_path: impl AsRef<Path>, exts: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| exts.iter().any(|want| want.eq_ignore_ascii_case(ext)));
            if matches {
                files.push(path);
            }
        } else if path.is_dir() {
            files.extend(collect_files(path, exts)?);
        }
    }

    files.sort();
    Ok(files)
}
