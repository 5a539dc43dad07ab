use deckscribe_json_pointer::{format_json_pointer, get, parse_json_pointer};
use serde_json::json;

#[test]
fn rfc6901_examples_resolve() {
    let doc = json!({
        "foo": ["bar", "baz"],
        "": 0,
        "a/b": 1,
        "c%d": 2,
        "e^f": 3,
        "g|h": 4,
        "i\\j": 5,
        "k\"l": 6,
        " ": 7,
        "m~n": 8
    });

    let cases = [
        ("", doc.clone()),
        ("/foo", json!(["bar", "baz"])),
        ("/foo/0", json!("bar")),
        ("/", json!(0)),
        ("/a~1b", json!(1)),
        ("/c%d", json!(2)),
        ("/e^f", json!(3)),
        ("/g|h", json!(4)),
        ("/i\\j", json!(5)),
        ("/k\"l", json!(6)),
        ("/ ", json!(7)),
        ("/m~0n", json!(8)),
    ];

    for (pointer, expected) in cases {
        let path = parse_json_pointer(pointer);
        assert_eq!(get(&doc, &path), Some(&expected), "pointer {pointer:?}");
        assert_eq!(format_json_pointer(&path), pointer);
    }
}

#[test]
fn deck_file_keys_with_slashes() {
    let deck = json!({"files": {"art/front.png": {"type": "image"}}});
    let path = parse_json_pointer("/files/art~1front.png/type");
    assert_eq!(get(&deck, &path), Some(&json!("image")));
}
