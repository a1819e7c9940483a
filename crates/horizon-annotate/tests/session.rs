//! End-to-end session tests: parse → mount → interact → hydrate → export.

use serde_json::json;

use horizon_annotate::config::{self, ElementKey};
use horizon_annotate::prelude::*;
use horizon_annotate::tags::control::{ChoiceTag, ChoicesTag, LabelTag, LabelsTag, TextAreaTag};
use horizon_annotate::tags::object::TextTag;
use horizon_annotate::AnnotateError;

const SENTIMENT_CONFIG: &str = r#"
<View>
  <Header value="Rate the article"/>
  <Labels name="sentiment" toName="article" choice="single">
    <Label value="Positive"/>
    <Label value="Negative"/>
  </Labels>
  <Text name="article" value="$text"/>
</View>
"#;

const NOTES_CONFIG: &str = r#"
<View>
  <Labels name="label" toName="text">
    <Label value="X"/>
  </Labels>
  <TextArea name="ta" toName="text"/>
  <Text name="text" value="$text"/>
</View>
"#;

fn click_label(session: &Session, group: &str, value: &str) {
    let group = session.find_active_controller(group).expect("group exists");
    let group = tag_cast::<LabelsTag>(group.as_ref()).expect("labels controller");
    for connection in session.bus().connections(group).expect("registered") {
        if let Some(label) = tag_cast::<LabelTag>(connection.as_ref()) {
            if label.value() == value {
                label.click(session.bus()).expect("click dispatches");
                return;
            }
        }
    }
    panic!("label {value} not found in group");
}

fn selected(session: &Session, group: &str) -> Vec<String> {
    let group = session.find_active_controller(group).expect("group exists");
    tag_cast::<LabelsTag>(group.as_ref())
        .expect("labels controller")
        .selected_labels()
}

// =============================================================================
// Selection semantics
// =============================================================================

#[test]
fn single_choice_selection_is_exclusive() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();

    click_label(&session, "sentiment", "Positive");
    assert_eq!(selected(&session, "sentiment"), vec!["Positive"]);

    // Selecting the other label replaces the selection.
    click_label(&session, "sentiment", "Negative");
    assert_eq!(selected(&session, "sentiment"), vec!["Negative"]);

    // Clicking the selected label deselects it.
    click_label(&session, "sentiment", "Negative");
    assert!(selected(&session, "sentiment").is_empty());
}

#[test]
fn multiple_choice_selection_accumulates() {
    let config = SENTIMENT_CONFIG.replace("choice=\"single\"", "choice=\"multiple\"");
    let session = SessionBuilder::new(config).build().unwrap();

    click_label(&session, "sentiment", "Positive");
    click_label(&session, "sentiment", "Negative");
    assert_eq!(
        selected(&session, "sentiment"),
        vec!["Positive", "Negative"]
    );

    click_label(&session, "sentiment", "Positive");
    assert_eq!(selected(&session, "sentiment"), vec!["Negative"]);
}

#[test]
fn clicks_after_re_render_toggle_exactly_once() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    session.render_root().unwrap();
    session.render_root().unwrap();

    // Were stale subscriptions left behind by the replaced controllers, a
    // single click would toggle more than once.
    click_label(&session, "sentiment", "Positive");
    assert_eq!(selected(&session, "sentiment"), vec!["Positive"]);
}

#[test]
fn selection_survives_re_render() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();

    click_label(&session, "sentiment", "Positive");
    session.render_root().unwrap();

    // The re-render replaced every controller; the fresh instance reads the
    // same selection slot.
    assert_eq!(selected(&session, "sentiment"), vec!["Positive"]);
}

// =============================================================================
// Region creation from interaction
// =============================================================================

#[test]
fn labeled_span_exports_as_labels_result() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    session.mark_object_loaded("article");
    click_label(&session, "sentiment", "Positive");

    let text = session.find_active_controller("article").unwrap();
    let text = tag_cast::<TextTag>(text.as_ref()).unwrap();
    let region = text
        .create_region(session.bus(), 0, 4, Some("Good"))
        .unwrap()
        .expect("region created");
    assert_eq!(region.to_name(), "article");

    let results = session.export();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.from_name, "sentiment");
    assert_eq!(result.to_name, "article");
    assert_eq!(result.result_type, "labels");
    assert_eq!(result.value["labels"], json!(["Positive"]));
    assert_eq!(result.value["start"], json!(0));
    assert_eq!(result.value["end"], json!(4));
}

#[test]
fn selection_before_load_is_rejected_softly() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    click_label(&session, "sentiment", "Positive");

    let text = session.find_active_controller("article").unwrap();
    let text = tag_cast::<TextTag>(text.as_ref()).unwrap();

    // The object never loaded: no region, no error.
    assert!(text
        .create_region(session.bus(), 0, 4, None)
        .unwrap()
        .is_none());
    assert!(session.regions().is_empty());

    session.mark_object_loaded("article");
    assert!(text
        .create_region(session.bus(), 0, 4, None)
        .unwrap()
        .is_some());
}

#[test]
fn span_without_selected_labels_creates_nothing() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    session.mark_object_loaded("article");

    let text = session.find_active_controller("article").unwrap();
    let text = tag_cast::<TextTag>(text.as_ref()).unwrap();
    assert!(text
        .create_region(session.bus(), 0, 4, None)
        .unwrap()
        .is_none());
}

#[test]
fn textarea_attaches_to_an_existing_region() {
    let session = SessionBuilder::new(NOTES_CONFIG).build().unwrap();
    session.mark_object_loaded("text");
    click_label(&session, "label", "X");

    let text = session.find_active_controller("text").unwrap();
    let text = tag_cast::<TextTag>(text.as_ref()).unwrap();
    let region = text
        .create_region(session.bus(), 0, 4, None)
        .unwrap()
        .unwrap();

    let ta = session.find_active_controller("ta").unwrap();
    let ta = tag_cast::<TextAreaTag>(ta.as_ref()).unwrap();
    let attached = ta.submit("a note", Some(region.id())).unwrap().unwrap();

    assert_eq!(attached.id(), region.id());
    assert_eq!(region.result_count(), 2);

    let results = session.export();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, results[1].id);
    assert_eq!(results[1].result_type, "textarea");
    assert_eq!(results[1].value["text"], json!(["a note"]));
}

#[test]
fn choices_commit_exports_a_classification() {
    let config = r#"
<View>
  <Choices name="topic" toName="text" choice="multiple">
    <Choice value="Politics"/>
    <Choice value="Sports"/>
  </Choices>
  <Text name="text" value="$text"/>
</View>
"#;
    let session = SessionBuilder::new(config).build().unwrap();

    let choices = session.find_active_controller("topic").unwrap();
    let choices = tag_cast::<ChoicesTag>(choices.as_ref()).unwrap();
    for connection in session.bus().connections(choices).unwrap() {
        if let Some(choice) = tag_cast::<ChoiceTag>(connection.as_ref()) {
            choice.click(session.bus()).unwrap();
        }
    }
    assert_eq!(choices.selected_choices().len(), 2);

    choices.commit_selection().expect("region created");
    let results = session.export();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].result_type, "choices");
    assert_eq!(
        results[0].value["choices"],
        json!(["Politics", "Sports"])
    );
}

// =============================================================================
// Hydration and round-trip
// =============================================================================

fn shared_id_results() -> Vec<RawResult> {
    serde_json::from_value(json!([
        {
            "id": "a",
            "from_name": "label",
            "to_name": "text",
            "type": "labels",
            "value": {"start": 0, "end": 4, "labels": ["X"]}
        },
        {
            "id": "a",
            "from_name": "ta",
            "to_name": "text",
            "type": "textarea",
            "value": {"text": ["note"]}
        }
    ]))
    .unwrap()
}

#[test]
fn results_sharing_an_id_hydrate_into_one_region() {
    let session = SessionBuilder::new(NOTES_CONFIG)
        .results(shared_id_results())
        .build()
        .unwrap();

    assert_eq!(session.regions().len(), 1);
    let region = session.regions().get("a").unwrap();
    assert_eq!(region.result_count(), 2);

    let exported = session.export();
    assert_eq!(exported.len(), 2);
    assert!(exported.iter().all(|result| result.id == "a"));
}

#[test]
fn hydrate_then_export_round_trips() {
    let raw = json!([
        {
            "id": "r1",
            "from_name": "label",
            "to_name": "text",
            "type": "labels",
            "origin": "prediction",
            "score": 0.91,
            "readonly": false,
            "value": {"start": 2, "end": 9, "text": "example", "labels": ["X"]}
        },
        {
            "id": "r2",
            "from_name": "ta",
            "to_name": "text",
            "type": "textarea",
            "value": {"text": ["first", "second"]}
        }
    ]);
    let results: Vec<RawResult> = serde_json::from_value(raw.clone()).unwrap();

    let session = SessionBuilder::new(NOTES_CONFIG)
        .results(results)
        .build()
        .unwrap();

    let exported = serde_json::to_value(session.export()).unwrap();
    assert_eq!(exported, raw);
}

#[test]
fn unknown_result_type_aborts_hydration() {
    let results: Vec<RawResult> = serde_json::from_value(json!([
        {
            "id": "r1",
            "from_name": "label",
            "to_name": "text",
            "type": "rectanglelabels",
            "value": {"x": 1}
        }
    ]))
    .unwrap();

    let err = SessionBuilder::new(NOTES_CONFIG)
        .results(results)
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Region value type rectanglelabels not found"
    );
}

#[test]
fn label_outside_taxonomy_is_a_data_error() {
    let results: Vec<RawResult> = serde_json::from_value(json!([
        {
            "id": "r1",
            "from_name": "label",
            "to_name": "text",
            "type": "labels",
            "value": {"start": 0, "end": 1, "labels": ["Zebra"]}
        }
    ]))
    .unwrap();

    let err = SessionBuilder::new(NOTES_CONFIG)
        .results(results)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        AnnotateError::UnknownLabel { label, control }
            if label == "Zebra" && control == "label"
    ));
}

#[test]
fn result_referencing_missing_control_is_rejected() {
    let results: Vec<RawResult> = serde_json::from_value(json!([
        {
            "id": "r1",
            "from_name": "nonexistent",
            "to_name": "text",
            "type": "labels",
            "value": {"start": 0, "end": 1, "labels": ["X"]}
        }
    ]))
    .unwrap();

    let err = SessionBuilder::new(NOTES_CONFIG)
        .results(results)
        .build()
        .unwrap_err();
    assert!(matches!(err, AnnotateError::UnknownFromName(name) if name == "nonexistent"));
}

// =============================================================================
// Configuration validation
// =============================================================================

#[test]
fn foreign_root_fails_validation_before_any_render() {
    let err = SessionBuilder::new(r#"<foo><Text name="t" value="$text"/></foo>"#)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        AnnotateError::Config(config::Error::InvalidRoot { found, .. }) if found == "foo"
    ));
}

#[test]
fn missing_required_attribute_fails_before_any_render() {
    // Labels requires both name and toname.
    let err = SessionBuilder::new(
        r#"<View><Labels toName="article"/><Text name="article" value="$text"/></View>"#,
    )
    .build()
    .unwrap_err();
    assert!(matches!(
        err,
        AnnotateError::Config(config::Error::MissingAttribute { attribute, tag })
            if attribute == "name" && tag == "labels"
    ));
}

#[test]
fn unknown_tags_are_skipped_not_fatal() {
    let config = r#"
<View>
  <Wizard step="1">
    <Labels name="label" toName="text"><Label value="X"/></Labels>
  </Wizard>
  <Text name="text" value="$text"/>
</View>
"#;
    let session = SessionBuilder::new(config).build().unwrap();
    // The wrapper vanished; its labeled descendants still mounted.
    assert!(session.find_active_controller("label").is_some());
    assert!(session.find_active_controller("text").is_some());
}

#[test]
fn custom_view_registry_must_cover_every_tag() {
    let err = SessionBuilder::new(SENTIMENT_CONFIG)
        .views(ViewRegistry::new())
        .build()
        .unwrap_err();
    assert!(matches!(err, AnnotateError::MissingView(_)));
}

// =============================================================================
// Render dispatch
// =============================================================================

fn child_tag_types(node: &RenderNode) -> Vec<String> {
    node.children()
        .iter()
        .map(|child| match child {
            RenderNode::Element { tag_type, .. } => tag_type.clone(),
            RenderNode::Text(_) => "#text".to_string(),
        })
        .collect()
}

#[test]
fn render_root_walks_the_tree_in_document_order() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    let root = session.render_root().unwrap();

    assert_eq!(root.id(), Some("view-0"));
    assert_eq!(child_tag_types(&root), vec!["header", "labels", "text"]);

    let labels = &root.children()[1];
    assert_eq!(child_tag_types(labels), vec!["label", "label"]);
}

#[test]
fn raw_text_passes_through_render_children() {
    let config = r#"<View>Read carefully:<Header value="h"/>then label.<Text name="t" value="$text"/></View>"#;
    let session = SessionBuilder::new(config).build().unwrap();
    let root = session.render_root().unwrap();

    assert_eq!(
        child_tag_types(&root),
        vec!["#text", "header", "#text", "text"]
    );
    assert_eq!(
        root.children()[0],
        RenderNode::Text("Read carefully:".to_string())
    );
}

#[test]
fn render_carries_view_props_from_resolved_attributes() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    let root = session.render_root().unwrap();

    let RenderNode::Element { props, .. } = &root.children()[0] else {
        panic!("header should be an element");
    };
    assert_eq!(props["value"], json!("Rate the article"));
    assert_eq!(props["size"], json!(4.0));

    let labels = &root.children()[1];
    let RenderNode::Element { props, children, .. } = labels else {
        panic!("labels should be an element");
    };
    assert_eq!(props["choice"], json!("single"));

    // Label backgrounds derive deterministically from their values.
    let RenderNode::Element { props: label_props, .. } = &children[0] else {
        panic!("label should be an element");
    };
    let background = label_props["background"].as_str().unwrap();
    assert!(background.starts_with('#'));
    let again = SessionBuilder::new(SENTIMENT_CONFIG)
        .build()
        .unwrap()
        .render_root()
        .unwrap();
    let RenderNode::Element { children, .. } = &again.children()[1] else {
        panic!();
    };
    let RenderNode::Element { props: again_props, .. } = &children[0] else {
        panic!();
    };
    assert_eq!(label_props["background"], again_props["background"]);
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn teardown_unregisters_and_destroys() {
    let session = SessionBuilder::new(NOTES_CONFIG)
        .results(shared_id_results())
        .build()
        .unwrap();
    assert!(!session.bus().is_empty());
    assert!(!session.regions().is_empty());

    session.teardown();

    assert!(session.bus().is_empty());
    assert!(session.regions().is_empty());
    assert!(session.find_active_controller("label").is_none());
}

#[test]
fn removing_a_region_twice_is_a_noop() {
    let session = SessionBuilder::new(NOTES_CONFIG)
        .results(shared_id_results())
        .build()
        .unwrap();

    assert!(session.regions().remove("a"));
    assert!(!session.regions().remove("a"));
    assert!(session.export().is_empty());
}

// Keep ElementKey in the public surface exercised: walk nodes by element key.
#[test]
fn nodes_are_indexed_by_their_markup_element() {
    let session = SessionBuilder::new(SENTIMENT_CONFIG).build().unwrap();
    let tree = session.tree();

    let keys: Vec<ElementKey> = tree.nodes().map(|node| node.element()).collect();
    for key in keys {
        assert!(tree.node(key).is_some());
    }
}
