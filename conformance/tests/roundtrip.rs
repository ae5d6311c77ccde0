use pretty_assertions::assert_eq;
use sb_builtins::Error;
use sb_conformance::{
    book::{Book, BookBinding},
    catalog::{Catalog, ItemTags},
    outline::{Section, SectionChoice},
    playlist::{Playlist, Track, Tracks},
};

#[test]
fn book_is_written_in_document_order() {
    let mut book = Book::default();
    book.set_isbn("123".to_string());
    book.set_title("Foo".to_string());
    book.add_author("A".to_string());
    book.add_author("B".to_string());

    let text = book.write_string().unwrap();
    assert_eq!(
        text,
        r#"<book isbn="123"><title>Foo</title><author>A</author><author>B</author></book>"#
    );
    assert_eq!(Book::parse_string(&text).unwrap(), book);
}

#[test]
fn book_reads_optional_and_typed_content() {
    let book = Book::parse_string(
        r#"<book isbn="9" binding="paperback">
            <title> Foo </title>
            <pages> 12 </pages>
            <author>A</author>
        </book>"#,
    )
    .unwrap();
    assert_eq!(book.isbn(), "9");
    assert_eq!(book.binding(), Some(&BookBinding::Paperback));
    assert_eq!(book.title(), " Foo ");
    assert_eq!(book.pages(), Some(&12));
    assert_eq!(book.author_list(), ["A".to_string()]);
}

#[test]
fn unknown_enumeration_values_become_invalid() {
    let mut book = Book::parse_string(r#"<book isbn="1" binding="spiral"><title/></book>"#).unwrap();
    assert_eq!(book.binding(), Some(&BookBinding::Invalid));
    assert_eq!(Book::binding_from_string("hardcover"), BookBinding::Hardcover);
    assert_eq!(Book::binding_to_string(BookBinding::Invalid), "");

    book.set_binding(None);
    assert_eq!(
        book.write_string().unwrap(),
        r#"<book isbn="1"><title></title></book>"#
    );
}

#[test]
fn wrong_root_and_bad_numbers_are_errors() {
    assert!(matches!(
        Book::parse_string("<magazine/>"),
        Err(Error::UnexpectedElement { .. })
    ));
    assert!(matches!(
        Book::parse_string(r#"<book isbn="1"><title/><pages>many</pages></book>"#),
        Err(Error::InvalidValue { .. })
    ));
}

#[test]
fn recursive_sections_round_trip() {
    let text = r#"<section title="A"><para>x</para><section title="B"><para>y</para></section><para>z</para></section>"#;
    let outline = Section::parse_string(text).unwrap();
    assert_eq!(outline.title(), "A");

    let children = outline.choice_list();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0], SectionChoice::Para("x".to_string()));
    match &children[1] {
        SectionChoice::Section(inner) => {
            assert_eq!(inner.title(), "B");
            assert_eq!(inner.choice_list(), [SectionChoice::Para("y".to_string())]);
        }
        other => panic!("expected a nested section, found {other:?}"),
    }

    assert_eq!(outline.write_string().unwrap(), text);
}

#[test]
fn catalog_from_xsd_round_trips() {
    let catalog = Catalog::parse_string(
        r#"<catalog version="2">
            <item id="7" available="true" tags="new  sale">
                <name>  Blue   Mug </name>
                <price>4.5</price>
            </item>
        </catalog>"#,
    )
    .unwrap();
    assert_eq!(*catalog.version(), 2);

    let item = &catalog.item_list()[0];
    assert_eq!(*item.id(), 7);
    assert_eq!(item.available(), Some(&true));
    assert_eq!(item.tags(), Some(&[ItemTags::New, ItemTags::Sale][..]));
    assert_eq!(item.name(), "Blue Mug");
    assert_eq!(*item.price(), 4.5);

    assert_eq!(
        catalog.write_string().unwrap(),
        r#"<catalog version="2"><item id="7" available="true" tags="new sale"><name>Blue Mug</name><price>4.5</price></item></catalog>"#
    );
}

#[test]
fn empty_collections_are_left_out() {
    let mut playlist = Playlist::default();
    playlist.set_name("Mix".to_string());

    let text = playlist.write_string().unwrap();
    assert_eq!(text, r#"<playlist name="Mix"></playlist>"#);
    assert_eq!(Playlist::parse_string(&text).unwrap(), playlist);

    let mut track = Track::default();
    track.set_title("A".to_string());
    let mut tracks = Tracks::default();
    tracks.add_track(track);
    playlist.set_tracks(tracks);
    assert_eq!(
        playlist.write_string().unwrap(),
        r#"<playlist name="Mix"><tracks><track title="A"></track></tracks></playlist>"#
    );
    assert_eq!(playlist.tracks().track_list().len(), 1);
}

#[test]
fn documents_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.xml");
    let mut catalog = Catalog::default();
    catalog.set_version(1);

    catalog.write_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<?xml"));
    assert_eq!(Catalog::parse_file(&path).unwrap(), catalog);
}
