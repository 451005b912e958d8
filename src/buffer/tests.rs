use std::fs;

use tempfile::tempdir;

use super::*;

fn type_text(buffer: &mut RopeBuffer, at: usize, text: &str) -> Cursor {
    let cursor = buffer.cursor_at(at);
    buffer.insert_bytes(cursor, text.as_bytes())
}

fn sample(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| if i % 17 == 16 { b'\n' } else { b'a' + (i % 26) as u8 })
        .collect()
}

#[test]
fn test_typing_into_empty_buffer() {
    let mut buffer = RopeBuffer::new();
    let mut cursor = buffer.cursor_at(0);
    for byte in *b"abc" {
        cursor = buffer.insert(cursor, byte);
    }
    assert_eq!(buffer.to_string(), "abc");
    assert_eq!(buffer.count_lines(), 1);
    assert_eq!(cursor.index, 3);
    assert!(buffer.is_modified());
}

#[test]
fn test_typing_grows_one_leaf() {
    let mut buffer = RopeBuffer::new();
    type_text(&mut buffer, 0, "hello");
    assert_eq!(buffer.rope().leaf_count(), 1);
    assert_eq!(buffer.rope().live_nodes(), 1);
    buffer.rope().assert_invariants();
}

#[test]
fn test_typing_starts_new_leaf_when_full() {
    let mut buffer = RopeBuffer::new();
    let text = "x".repeat(100);
    type_text(&mut buffer, 0, &text);
    assert_eq!(buffer.to_string(), text);
    assert_eq!(buffer.rope().leaf_count(), 2);
    buffer.rope().assert_invariants();
}

#[test]
fn test_typing_elsewhere_takes_slow_path() {
    let mut buffer = RopeBuffer::from_bytes(b"0123456789");
    type_text(&mut buffer, 10, "ab");
    type_text(&mut buffer, 3, "cd");
    assert_eq!(buffer.to_string(), "012cd3456789ab");
    buffer.rope().assert_invariants();
}

#[test]
fn test_snapshot_is_not_mutated_by_typing() {
    let mut buffer = RopeBuffer::new();
    type_text(&mut buffer, 0, "abc");
    let snapshot = buffer.snapshot();
    let cursor = buffer.cursor_at(3);
    let cursor = buffer.insert(cursor, b'd');
    buffer.insert(cursor, b'e');
    assert_eq!(snapshot.to_bytes(), b"abc");
    assert_eq!(buffer.to_string(), "abcde");
    snapshot.assert_invariants();
    buffer.rope().assert_invariants();
}

#[test]
fn test_clone_held_elsewhere_blocks_growth() {
    let mut buffer = RopeBuffer::new();
    let cursor = type_text(&mut buffer, 0, "ab");
    // A clone taken without going through `snapshot` keeps coalescing armed,
    // so the shared path must be detected by ref count alone.
    let held = buffer.rope().clone();
    buffer.insert(cursor, b'c');
    assert_eq!(held.to_bytes(), b"ab");
    assert_eq!(buffer.to_string(), "abc");
}

#[test]
fn test_insert_newline_moves_points() {
    let mut buffer = RopeBuffer::from_bytes(b"ab\ncd");
    let cursor = buffer.cursor_at(1);
    let after = buffer.insert(cursor, b'\n');
    assert_eq!(buffer.to_string(), "a\nb\ncd");
    assert_eq!(buffer.cursor_at_point(1, 0).index, 2);
    assert_eq!((after.line(), after.column()), (1, 0));
    assert_eq!(buffer.count_lines(), 3);
}

#[test]
fn test_remove_at_chunk_boundary() {
    let content = sample(200);
    let mut buffer = RopeBuffer::from_bytes(&content);
    let cursor = buffer.cursor_at(65);
    let cursor = buffer.remove(cursor);

    let mut expected = content.clone();
    expected.remove(64);
    assert_eq!(buffer.to_bytes(), expected);
    assert_eq!(cursor.index, 64);
    assert!(buffer.rope().is_balanced());
    buffer.rope().assert_invariants();
}

#[test]
fn test_remove_at_start_does_nothing() {
    let mut buffer = RopeBuffer::from_bytes(b"abc");
    let revision = buffer.revision();
    let cursor = buffer.cursor_at(0);
    let cursor = buffer.remove(cursor);
    assert_eq!(cursor.index, 0);
    assert_eq!(buffer.to_string(), "abc");
    assert_eq!(buffer.revision(), revision);
    assert!(!buffer.is_modified());
}

#[test]
fn test_remove_everything_keeps_a_root() {
    let mut buffer = RopeBuffer::from_bytes(b"ab");
    let mut cursor = buffer.cursor_at(2);
    cursor = buffer.remove(cursor);
    cursor = buffer.remove(cursor);
    assert!(buffer.is_empty());
    assert!(buffer.rope().root().is_some());
    assert_eq!(buffer.count_lines(), 1);

    buffer.insert(cursor, b'z');
    assert_eq!(buffer.to_string(), "z");
}

#[test]
fn test_cursor_at_clamps() {
    let buffer = RopeBuffer::from_bytes(b"abc");
    assert_eq!(buffer.cursor_at(99).index, 3);
    assert!(buffer.is_eof(&buffer.cursor_at(99)));
}

#[test]
fn test_cursor_at_point_past_line_end() {
    let buffer = RopeBuffer::from_bytes(b"hello\nhi");
    assert_eq!(buffer.cursor_at_point(0, 10).index, 5);
    assert_eq!(buffer.cursor_at_point(1, 10).index, 8);
    assert_eq!(buffer.cursor_at_point(7, 0).index, 6);
}

#[test]
fn test_cursor_point_matches_scan() {
    let content = sample(500);
    let buffer = RopeBuffer::from_bytes(&content);
    let mut line = 0;
    let mut column = 0;
    for (index, &byte) in content.iter().enumerate() {
        let cursor = buffer.cursor_at(index);
        assert_eq!(
            (cursor.line(), cursor.column()),
            (line, column),
            "at {index}"
        );
        assert_eq!(buffer.cursor_at_point(line, column).index, index);
        if byte == b'\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
}

#[test]
fn test_char_at() {
    let mut buffer = RopeBuffer::from_bytes(b"abc");
    let stale = buffer.cursor_at(1);
    assert_eq!(buffer.char_at(&stale), Some(b'b'));

    let start = buffer.cursor_at(0);
    buffer.insert(start, b'>');
    // Stale cursors fall back to their index.
    assert_eq!(buffer.char_at(&stale), Some(b'a'));
    assert_eq!(buffer.char_at(&buffer.cursor_at(4)), None);
}

#[test]
fn test_char_at_with_cursor_from_another_buffer() {
    let big = RopeBuffer::from_bytes(&sample(5000));
    let small = RopeBuffer::from_bytes(b"hi");
    let foreign = big.cursor_at(4000);
    assert_ne!(foreign.revision(), small.revision());
    assert_eq!(small.char_at(&foreign), None);
    assert_eq!(small.char_at(&big.cursor_at(1)), Some(b'i'));
}

#[test]
fn test_insert_position_resolves_leaf_ending_at_boundary() {
    let buffer = RopeBuffer::from_bytes(&sample(200));
    let before = buffer.insert_position(64);
    let after = buffer.cursor_at(64);
    assert_eq!((before.index, before.summary), (after.index, after.summary));
    assert_ne!(before.leaf, after.leaf);
    assert_eq!(after.offset, 0);

    let store = buffer.rope().store();
    let chunk = store.committed(before.leaf).chunk().unwrap();
    assert_eq!(before.offset, chunk.size);
    assert_eq!(chunk.end(), 64);
}

#[test]
fn test_typing_mid_document_grows_leaf_before_boundary() {
    let mut buffer = RopeBuffer::from_bytes(b"xy");
    type_text(&mut buffer, 1, "abc");
    // Each byte after the first lands on the boundary between the growing
    // leaf and "y"; the leaf ending there is the one extended.
    assert_eq!(buffer.to_string(), "xabcy");
    assert_eq!(buffer.rope().leaf_count(), 3);
    buffer.rope().assert_invariants();
}

#[test]
fn test_lines() {
    let buffer = RopeBuffer::from_bytes(b"first\n\nthird line\n");
    assert_eq!(buffer.count_lines(), 4);
    assert_eq!(buffer.line(0), b"first");
    assert_eq!(buffer.line(1), b"");
    assert_eq!(buffer.line(2), b"third line");
    assert_eq!(buffer.line(3), b"");
    assert_eq!(buffer.line(9), b"");
    assert_eq!(buffer.line_len(2), 10);
}

#[test]
fn test_line_spanning_chunks() {
    let long = "y".repeat(150);
    let buffer = RopeBuffer::from_bytes(format!("x\n{long}\nz").as_bytes());
    assert_eq!(buffer.line(1), long.as_bytes());
    assert_eq!(buffer.line_len(1), 150);
}

#[test]
fn test_save_and_reopen() {
    crate::log::test();
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");

    let mut buffer = RopeBuffer::from_bytes(&sample(300));
    type_text(&mut buffer, 10, "inserted");
    buffer.save_as(&path, &SaveOptions::default()).unwrap();
    assert!(!buffer.is_modified());

    assert_eq!(fs::read(&path).unwrap(), buffer.to_bytes());
    let reopened = RopeBuffer::open(&path).unwrap();
    assert_eq!(reopened.to_bytes(), buffer.to_bytes());
    assert_eq!(reopened.path(), Some(path.as_path()));
}

#[test]
fn test_save_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    let mut buffer = RopeBuffer::from_bytes(b"data");
    buffer.save_as(&path, &SaveOptions::default()).unwrap();
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_save_with_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "old").unwrap();

    let mut buffer = RopeBuffer::open(&path).unwrap();
    type_text(&mut buffer, 3, "er");
    buffer.save(&SaveOptions { backup: true }).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "older");
    let backup = dir.path().join("config.json~");
    assert_eq!(fs::read_to_string(backup).unwrap(), "old");
}

#[test]
fn test_save_without_path() {
    let mut buffer = RopeBuffer::from_bytes(b"x");
    assert!(matches!(buffer.write_to_disk(), Err(BufferError::Unnamed)));
}

#[test]
fn test_load_missing_file_keeps_path() {
    crate::log::test();
    let dir = tempdir().unwrap();
    let path = dir.path().join("new.txt");
    let buffer = RopeBuffer::load(Some(path.as_path()));
    assert!(buffer.is_empty());
    assert_eq!(buffer.path(), Some(path.as_path()));
    assert!(matches!(
        RopeBuffer::open(&path),
        Err(BufferError::Read { .. })
    ));
}

#[test]
fn test_open_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    fs::write(&path, "").unwrap();
    let buffer = RopeBuffer::open(&path).unwrap();
    assert!(buffer.is_empty());
    assert_eq!(buffer.count_lines(), 1);
}

#[test]
fn test_manager_reuses_buffers() {
    crate::log::test();
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.txt");
    fs::write(&path, "shared").unwrap();

    let mut manager = BufferManager::new();
    let first = manager.get_or_open(&path);
    let second = manager.get_or_open(&path);
    assert_eq!(first, second);
    assert_eq!(manager.len(), 1);

    let scratch = manager.create();
    assert_ne!(scratch, first);
    assert_eq!(manager.len(), 2);
    assert_eq!(manager.get(first).unwrap().to_string(), "shared");
}

#[test]
fn test_manager_close_forgets_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("closed.txt");
    let mut manager = BufferManager::new();
    let id = manager.get_or_open(&path);
    assert!(manager.close(id).is_some());
    assert!(manager.get(id).is_none());
    assert!(manager.find(&path).is_none());
    assert!(manager.close(id).is_none());
}

#[test]
fn test_manager_save_as_rekeys() {
    let dir = tempdir().unwrap();
    let taken = dir.path().join("taken.txt");
    let fresh = dir.path().join("fresh.txt");

    let mut manager = BufferManager::new();
    let owner = manager.get_or_open(&taken);
    let scratch = manager.create();

    let result = manager.save_as(scratch, &taken, &SaveOptions::default());
    assert!(matches!(result, Err(BufferError::AlreadyOpen(_))));

    manager.save_as(scratch, &fresh, &SaveOptions::default()).unwrap();
    assert_eq!(manager.find(&fresh), Some(scratch));
    assert_eq!(manager.find(&taken), Some(owner));
}

#[test]
fn test_manager_save_as_closed_buffer() {
    let dir = tempdir().unwrap();
    let mut manager = BufferManager::new();
    let id = manager.create();
    manager.close(id);

    let path = dir.path().join("gone.txt");
    let result = manager.save_as(id, &path, &SaveOptions::default());
    assert!(matches!(result, Err(BufferError::Closed)));
    assert!(!path.exists());
}
