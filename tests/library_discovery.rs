use std::fs;
use std::path::{Path, PathBuf};

use ring_gallery::config::{Configuration, ItemSpec, LibraryOptions};
use ring_gallery::tasks::library::discover_items;

fn touch(path: &Path) {
    fs::write(path, b"not a real image, discovery only checks extensions").unwrap();
}

fn dir_options(dir: PathBuf) -> LibraryOptions {
    let mut opts = Configuration::default().library;
    opts.items_dir = Some(dir);
    opts
}

#[test]
fn scans_recursively_and_skips_non_media() {
    let root = tempfile::tempdir().unwrap();
    touch(&root.path().join("b_second.jpg"));
    touch(&root.path().join("a_first.png"));
    touch(&root.path().join("notes.txt"));
    let nested = root.path().join("nested");
    fs::create_dir(&nested).unwrap();
    touch(&nested.join("deep_cut.webp"));

    let items = discover_items(&dir_options(root.path().to_path_buf())).unwrap();
    let captions: Vec<&str> = items.iter().map(|i| i.caption.as_str()).collect();
    // Name-sorted scan, directories visited in order, text file ignored.
    assert_eq!(captions, ["A First", "B Second", "Deep Cut"]);
    assert!(items.iter().all(|i| i.path.is_some()));
}

#[test]
fn explicit_items_precede_the_scanned_directory() {
    let root = tempfile::tempdir().unwrap();
    touch(&root.path().join("scanned.jpg"));

    let mut opts = dir_options(root.path().to_path_buf());
    opts.items = vec![
        ItemSpec {
            path: PathBuf::from("/pinned/hero.jpg"),
            caption: Some("Hero Shot".to_string()),
        },
        ItemSpec {
            path: PathBuf::from("/pinned/second_take.png"),
            caption: None,
        },
    ];

    let items = discover_items(&opts).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].caption, "Hero Shot");
    // No explicit caption: humanized from the file stem.
    assert_eq!(items[1].caption, "Second Take");
    assert_eq!(items[2].caption, "Scanned");
}

#[test]
fn seeded_shuffle_is_deterministic_and_spares_explicit_items() {
    let root = tempfile::tempdir().unwrap();
    for i in 0..12 {
        touch(&root.path().join(format!("photo_{i:02}.jpg")));
    }

    let mut opts = dir_options(root.path().to_path_buf());
    opts.items = vec![ItemSpec {
        path: PathBuf::from("/pinned/always_first.jpg"),
        caption: None,
    }];
    opts.shuffle_seed = Some(7);

    let a = discover_items(&opts).unwrap();
    let b = discover_items(&opts).unwrap();
    let order_a: Vec<_> = a.iter().map(|i| i.path.clone()).collect();
    let order_b: Vec<_> = b.iter().map(|i| i.path.clone()).collect();
    assert_eq!(order_a, order_b);
    assert_eq!(a[0].caption, "Always First");

    // A different seed permutes the scanned tail.
    opts.shuffle_seed = Some(8);
    let c = discover_items(&opts).unwrap();
    let order_c: Vec<_> = c.iter().map(|i| i.path.clone()).collect();
    assert_ne!(order_a, order_c);
    assert_eq!(c[0].caption, "Always First");
}

#[test]
fn empty_library_discovers_nothing() {
    let root = tempfile::tempdir().unwrap();
    let items = discover_items(&dir_options(root.path().to_path_buf())).unwrap();
    assert!(items.is_empty());
}
