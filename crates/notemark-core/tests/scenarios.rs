// End-to-end editing scenarios across codecs, engine, session and collaborators.

use notemark_core::{
    Block, EditorAction, EditorConfig, HeadingLevel, InlineSpan, LinkResolution, MemoryNoteStore,
    NoteStore, NoteTitles, Session, SyncOutcome, block, image_markdown, inline, parse_tags,
    resolve_link,
};

#[test]
fn heading_and_bold_round_trip_byte_identical() {
    let source = "# Title\n\nSome **bold** text.\n";
    assert_eq!(block::encode(&block::decode(source)), source);
}

#[test]
fn toggle_task_then_type_on_empty_paragraph() {
    let mut session = Session::default();
    session.open("scratch", "");

    assert_eq!(
        session.execute(&EditorAction::ToggleTaskList),
        SyncOutcome::Propagated
    );
    session.type_text("done");

    assert_eq!(session.get_markdown().as_deref(), Some("- [ ] done"));
    assert_eq!(
        block::decode("- [ ] done"),
        vec![Block::TaskListItem {
            checked: false,
            content: inline::decode("done"),
        }]
    );
}

#[test]
fn unresolved_wikilink_is_not_an_error() {
    let run = inline::decode("[[Meeting Notes]]");
    assert_eq!(run.spans(), &[InlineSpan::InternalLink("Meeting Notes".into())]);

    let titles: NoteTitles = ["Groceries"].into_iter().collect();
    assert_eq!(resolve_link(&titles, "Meeting Notes"), LinkResolution::NotFound);
}

#[test]
fn heading_commands_through_session() {
    let mut session = Session::default();
    session.open("n", "Intro\nbody");
    session.execute(&EditorAction::MoveCursor { offset: 2 });

    session.execute(&EditorAction::SetHeadingLevel(HeadingLevel::new(1)));
    session.execute(&EditorAction::SetHeadingLevel(HeadingLevel::new(3)));
    assert_eq!(session.get_markdown().as_deref(), Some("### Intro\nbody"));

    session.execute(&EditorAction::Undo);
    assert_eq!(session.get_markdown().as_deref(), Some("# Intro\nbody"));
    session.execute(&EditorAction::Undo);
    assert_eq!(session.get_markdown().as_deref(), Some("Intro\nbody"));
    assert_eq!(session.execute(&EditorAction::Undo), SyncOutcome::Unchanged);
}

#[test]
fn ai_rewrite_for_closed_note_is_dropped() {
    let mut store = MemoryNoteStore::new()
        .with_note("a", "first\n")
        .with_note("b", "second\n");
    let mut session = Session::default();

    let pending = session.open_from(&store, "a").unwrap();
    session.open_from(&store, "b").unwrap();

    // The rewrite requested for "a" arrives after the switch.
    assert_eq!(
        session.apply_external(pending, "# Rewritten\n"),
        SyncOutcome::Discarded
    );
    session.save_to(&mut store).unwrap();
    assert_eq!(store.load_markdown("a").unwrap(), "first\n");
    assert_eq!(store.load_markdown("b").unwrap(), "second\n");
}

#[test]
fn ai_tags_are_normalized() {
    assert_eq!(parse_tags("Work, Planning ,work,"), vec!["work", "planning"]);
}

#[test]
fn dropped_image_embeds_untouched() {
    let uri = "data:image/png;base64,iVBOR(w0)KGgo=";
    let mut session = Session::default();
    session.open("n", "caption");
    session.execute(&EditorAction::MoveCursor { offset: 7 });

    assert_eq!(session.insert_image("photo", uri), SyncOutcome::Propagated);
    let markdown = session.get_markdown().unwrap();
    assert_eq!(markdown, format!("caption\n{}", image_markdown("photo", uri)));
    assert_eq!(
        block::decode(&markdown)[1],
        Block::Image {
            alt: "photo".into(),
            src: uri.into(),
        }
    );
}

#[test]
fn configured_history_capacity_bounds_undo() {
    let config = EditorConfig {
        history_capacity: 3,
        coalesce_window_ms: 0,
        ..EditorConfig::default()
    };
    let mut session = Session::new(config);
    session.open("n", "");
    for word in ["a", "b", "c", "d"] {
        session.type_text(word);
    }
    assert_eq!(session.history().map(|h| h.len()), Some(3));

    while session.undo() == SyncOutcome::Rebuilt {}
    assert_eq!(session.get_markdown().as_deref(), Some("ab"));
}

#[test]
fn normalized_note_snapshot() {
    let messy = "# Groceries\n- [X] milk\n- [ ] eggs\nremember **cash**\n> bring bags\n> and list\n```\ncode\n```";
    insta::assert_snapshot!(block::encode(&block::decode(messy)), @r"
    # Groceries

    - [x] milk
    - [ ] eggs

    remember **cash**

    > bring bags
    > and list

    ```
    code
    ```
    ");
}
