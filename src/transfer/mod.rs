use crate::models::Collection;
use crate::state::Session;
use leptos::logging::{log, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

pub(crate) const EXPORT_ALL_FILE_NAME: &str = "all_notes_and_groups.json";
const UNTITLED_GROUP_STEM: &str = "UntitledGroup";
const FILE_NAME_RESERVED: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ImportErrorKind {
    InvalidJson,
    MissingKey,
}

#[derive(Clone, Debug)]
pub(crate) struct ImportError {
    pub kind: ImportErrorKind,
    pub message: String,
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ImportError {
    fn invalid_json(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ImportErrorKind::InvalidJson,
            message: format!("Error reading the file. Please ensure it's a valid JSON file. ({e})"),
        }
    }

    fn missing_key(key: &str) -> Self {
        Self {
            kind: ImportErrorKind::MissingKey,
            message: format!("Invalid notes file format: missing `{key}`."),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub groups_added: usize,
    pub notes_added: usize,
    pub members_added: usize,
    /// Member references discarded because they were dangling or already claimed.
    pub dropped: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} group(s) and {} note(s)",
            self.groups_added, self.notes_added
        )?;
        if self.dropped > 0 {
            write!(f, "; skipped {} invalid reference(s)", self.dropped)?;
        }
        Ok(())
    }
}

/// Parse an import file. Both top-level maps must be present; nothing is applied otherwise.
pub(crate) fn parse_document(json: &str) -> Result<Collection, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(ImportError::invalid_json)?;
    for key in ["groups", "notes"] {
        if !value.get(key).is_some_and(|v| v.is_object()) {
            return Err(ImportError::missing_key(key));
        }
    }
    // Deserialize from the text so the maps keep document order.
    serde_json::from_str(json).map_err(ImportError::invalid_json)
}

/// Merge an imported document into the live collection.
///
/// Local data wins: existing notes keep their content and existing groups keep their
/// title and collapsed state. Imported members are appended to existing groups without
/// duplicates, then membership is normalized so every note is in at most one group.
pub(crate) fn merge_import(collection: &mut Collection, imported: Collection) -> ImportSummary {
    let member_count = |c: &Collection| c.groups.values().map(|g| g.notes.len()).sum::<usize>();
    let members_before = member_count(collection);
    let mut summary = ImportSummary::default();

    for (id, note) in imported.notes {
        if !collection.contains_note(&id) {
            collection.notes.insert(id, note);
            summary.notes_added += 1;
        }
    }

    for (id, group) in imported.groups {
        match collection.groups.get_mut(&id) {
            Some(existing) => {
                for n in group.notes {
                    if !existing.notes.contains(&n) {
                        existing.notes.push(n);
                    }
                }
            }
            None => {
                collection.groups.insert(id, group);
                summary.groups_added += 1;
            }
        }
    }

    summary.dropped = collection.normalize();
    summary.members_added = member_count(collection).saturating_sub(members_before);
    summary
}

pub(crate) fn import_json(
    collection: &mut Collection,
    json: &str,
) -> Result<ImportSummary, ImportError> {
    let imported = parse_document(json).inspect_err(|e| warn!("[import] rejected: {e}"))?;
    let summary = merge_import(collection, imported);
    log!("[import] {summary:?}");
    Ok(summary)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExportFile {
    pub file_name: String,
    pub document: Collection,
}

impl ExportFile {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

/// The open note's group and its members if there is one, otherwise everything.
pub(crate) fn export_document(collection: &Collection, session: &Session) -> ExportFile {
    let Some((id, group)) = session
        .selected_group(collection)
        .and_then(|id| collection.groups.get_key_value(id))
    else {
        return ExportFile {
            file_name: EXPORT_ALL_FILE_NAME.to_string(),
            document: collection.clone(),
        };
    };

    let mut document = Collection::default();
    for n in &group.notes {
        if let Some(note) = collection.notes.get(n) {
            document.notes.insert(n.clone(), note.clone());
        }
    }
    document.groups.insert(id.clone(), group.clone());

    ExportFile {
        file_name: format!("{}.json", sanitize_file_stem(&group.title)),
        document,
    }
}

pub(crate) fn sanitize_file_stem(title: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() {
        UNTITLED_GROUP_STEM
    } else {
        title
    };
    title
        .chars()
        .map(|c| {
            if FILE_NAME_RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Trigger a browser download of `json` through a `data:` URL.
pub(crate) fn download_json(file_name: &str, json: &str) -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| "Document is not available".to_string())?;
    let anchor = document
        .create_element("a")
        .map_err(|e| format!("{e:?}"))?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|_| "Failed to create download link".to_string())?;

    anchor.set_href(&format!(
        "data:application/json;charset=utf-8,{}",
        urlencoding::encode(json)
    ));
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}

/// Read a picked file as text and hand the result to `on_done` once loading ends.
pub(crate) fn read_file_text(
    file: web_sys::File,
    on_done: impl FnOnce(Result<String, String>) + 'static,
) -> Result<(), String> {
    let reader = web_sys::FileReader::new().map_err(|e| format!("{e:?}"))?;
    let reader_for_cb = reader.clone();

    let cb = Closure::once_into_js(move || {
        let text = reader_for_cb
            .result()
            .ok()
            .and_then(|v| v.as_string())
            .ok_or_else(|| "Could not read the selected file".to_string());
        on_done(text);
    });
    reader.set_onloadend(Some(cb.as_ref().unchecked_ref()));
    reader.read_as_text(&file).map_err(|e| format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupId, NoteId};

    fn doc(json: &str) -> Collection {
        parse_document(json).expect("document should parse")
    }

    #[test]
    fn test_parse_rejects_missing_keys() {
        let err = parse_document(r#"{"notes": {}}"#).expect_err("groups missing");
        assert_eq!(err.kind, ImportErrorKind::MissingKey);
        assert!(err.message.contains("groups"));

        let err = parse_document(r#"{"groups": {}, "notes": []}"#).expect_err("notes wrong type");
        assert_eq!(err.kind, ImportErrorKind::MissingKey);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_document("not json").expect_err("should fail");
        assert_eq!(err.kind, ImportErrorKind::InvalidJson);
    }

    #[test]
    fn test_rejected_import_applies_nothing() {
        let mut c = Collection::default();
        c.create_note();
        let before = c.clone();
        assert!(import_json(&mut c, r#"{"groups": {"g": {"title": "G"}}}"#).is_err());
        assert_eq!(c, before);
    }

    #[test]
    fn test_parse_accepts_legacy_note_fields() {
        // Older exports carried an `id` inside each note and omitted `collapsed`.
        let c = doc(
            r#"{"groups": {"1700000000001": {"title": "G", "notes": ["1700000000000"]}},
                "notes": {"1700000000000": {"id": "1700000000000", "content": "Hi"}}}"#,
        );
        let g = &c.groups[&GroupId::from("1700000000001")];
        assert!(!g.collapsed);
        assert_eq!(c.notes[&NoteId::from("1700000000000")].content, "Hi");
    }

    #[test]
    fn test_merge_adds_new_and_keeps_local_content() {
        let mut c = doc(r#"{"groups": {}, "notes": {"a": {"content": "local"}}}"#);
        let summary = merge_import(
            &mut c,
            doc(r#"{"groups": {}, "notes": {"a": {"content": "imported"}, "b": {"content": "B"}}}"#),
        );
        assert_eq!(summary.notes_added, 1);
        assert_eq!(c.notes[&NoteId::from("a")].content, "local");
        assert_eq!(c.notes[&NoteId::from("b")].content, "B");
    }

    #[test]
    fn test_reimport_does_not_duplicate_members() {
        let json = r#"{"groups": {"g": {"title": "G", "notes": ["a", "b"], "collapsed": false}},
                       "notes": {"a": {"content": "A"}, "b": {"content": "B"}}}"#;
        let mut c = Collection::default();
        let first = merge_import(&mut c, doc(json));
        assert_eq!(first.groups_added, 1);
        assert_eq!(first.members_added, 2);

        let again = merge_import(&mut c, doc(json));
        assert_eq!(again, ImportSummary::default());
        assert_eq!(
            c.groups[&GroupId::from("g")].notes,
            vec![NoteId::from("a"), NoteId::from("b")]
        );
    }

    #[test]
    fn test_merge_into_existing_group_appends_and_keeps_title() {
        let mut c = doc(
            r#"{"groups": {"g": {"title": "Mine", "notes": ["a"], "collapsed": true}},
                "notes": {"a": {"content": "A"}}}"#,
        );
        merge_import(
            &mut c,
            doc(r#"{"groups": {"g": {"title": "Theirs", "notes": ["b", "a"]}},
                    "notes": {"b": {"content": "B"}}}"#),
        );
        let g = &c.groups[&GroupId::from("g")];
        assert_eq!(g.title, "Mine");
        assert!(g.collapsed);
        assert_eq!(g.notes, vec![NoteId::from("a"), NoteId::from("b")]);
    }

    #[test]
    fn test_merge_keeps_single_membership_and_drops_dangling() {
        let mut c = doc(
            r#"{"groups": {"mine": {"title": "Mine", "notes": ["a"]}},
                "notes": {"a": {"content": "A"}}}"#,
        );
        let summary = merge_import(
            &mut c,
            doc(r#"{"groups": {"theirs": {"title": "Theirs", "notes": ["a", "ghost"]}},
                    "notes": {}}"#),
        );
        assert_eq!(summary.groups_added, 1);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.members_added, 0);
        assert!(c.groups[&GroupId::from("theirs")].notes.is_empty());
        assert_eq!(c.group_of(&NoteId::from("a")), Some(&GroupId::from("mine")));
    }

    #[test]
    fn test_export_scoped_to_open_notes_group() {
        let mut c = Collection::default();
        let g = c.create_group();
        let other = c.create_group();
        let a = c.create_note();
        let b = c.create_note();
        let loose = c.create_note();
        let elsewhere = c.create_note();
        c.rename_group(&g, "Trip: Rome/Paris");
        c.move_note_to_group(&a, Some(&g));
        c.move_note_to_group(&b, Some(&g));
        c.move_note_to_group(&elsewhere, Some(&other));

        let mut s = Session::default();
        s.open_note(b.clone());
        let out = export_document(&c, &s);

        assert_eq!(out.file_name, "Trip_ Rome_Paris.json");
        assert_eq!(out.document.groups.keys().collect::<Vec<_>>(), vec![&g]);
        assert_eq!(out.document.notes.keys().collect::<Vec<_>>(), vec![&a, &b]);
        assert!(!out.document.contains_note(&loose));
    }

    #[test]
    fn test_export_everything_without_group_context() {
        let mut c = Collection::default();
        let g = c.create_group();
        let a = c.create_note();
        let b = c.create_note();
        c.move_note_to_group(&a, Some(&g));

        let mut s = Session::default();
        let out = export_document(&c, &s);
        assert_eq!(out.file_name, EXPORT_ALL_FILE_NAME);
        assert_eq!(out.document, c);

        s.open_note(b);
        assert_eq!(export_document(&c, &s).file_name, EXPORT_ALL_FILE_NAME);
    }

    #[test]
    fn test_parse_keeps_document_order() {
        let c = doc(
            r#"{"groups": {"zz": {"title": "Z"}, "aa": {"title": "A"}, "mm": {"title": "M"}},
                "notes": {"n9": {"content": "9"}, "n1": {"content": "1"}, "n5": {"content": "5"}}}"#,
        );
        assert_eq!(
            c.groups.keys().collect::<Vec<_>>(),
            vec![&GroupId::from("zz"), &GroupId::from("aa"), &GroupId::from("mm")]
        );
        assert_eq!(
            c.notes.keys().collect::<Vec<_>>(),
            vec![&NoteId::from("n9"), &NoteId::from("n1"), &NoteId::from("n5")]
        );
    }

    #[test]
    fn test_export_json_reimports_cleanly() {
        let mut c = Collection::default();
        let groups: Vec<GroupId> = (0..4).map(|_| c.create_group()).collect();
        let notes: Vec<NoteId> = (0..6).map(|_| c.create_note()).collect();
        c.move_note_to_group(&notes[4], Some(&groups[2]));
        c.move_note_to_group(&notes[1], Some(&groups[2]));
        c.move_note_to_group(&notes[3], Some(&groups[0]));
        // Random ids are almost never sorted; force a non-sorted order regardless.
        let mut sorted: Vec<GroupId> = c.groups.keys().cloned().collect();
        sorted.sort();
        c.reorder_groups(&sorted[0], 3);
        let mut sorted_notes: Vec<NoteId> = c.ungrouped_notes().into_iter().cloned().collect();
        sorted_notes.sort();
        c.reorder_within_container(
            None,
            &crate::models::ItemRef::Note(sorted_notes[0].clone()),
            usize::MAX,
        );

        let json = export_document(&c, &Session::default())
            .to_json()
            .expect("should serialize");
        let mut fresh = Collection::default();
        import_json(&mut fresh, &json).expect("should import");
        assert_eq!(fresh, c);
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("  "), UNTITLED_GROUP_STEM);
        assert_eq!(sanitize_file_stem(r#"a/b\c?d%e*f:g|h"i<j>k"#), "a_b_c_d_e_f_g_h_i_j_k");
        assert_eq!(sanitize_file_stem(" Work "), "Work");
    }
}
