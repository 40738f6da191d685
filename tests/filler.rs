mod support;

use agentic_forms::filler::{fill, FillOutcome};
use agentic_forms::locator::composite_xpath;
use agentic_forms::{Error, FieldKind, FieldSpec, FieldValue};
use support::*;

fn list(items: &[&str]) -> FieldValue {
    FieldValue::List(items.iter().map(|s| s.to_string()).collect())
}

async fn run(surface: &FakeSurface, field: FieldSpec) -> FillOutcome {
    fill(surface, &field, &settings()).await.unwrap()
}

#[tokio::test]
async fn text_is_cleared_then_typed() {
    let surface = FakeSurface::new(vec![Node::new("name", aria(TEXT_INPUT, "Name")).value("old")]);
    let outcome = run(&surface, FieldSpec::new("Name", FieldKind::Text, "Ada")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.value_of("name"), "Ada");
    assert_eq!(surface.journal(), vec!["clear name", "type name Ada"]);
}

#[tokio::test]
async fn failed_clear_still_types() {
    let surface = FakeSurface::new(vec![Node::new("name", aria(TEXT_INPUT, "Name")).clear_fails()]);
    let outcome = run(&surface, FieldSpec::new("Name", FieldKind::Paragraph, "Ada")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.journal(), vec!["type name Ada"]);
}

#[tokio::test]
async fn absent_text_field_is_not_found() {
    let surface = FakeSurface::new(vec![Node::new("name", aria(TEXT_INPUT, "Name"))]);
    let outcome = run(&surface, FieldSpec::new("Company", FieldKind::Text, "ACME")).await;
    assert_eq!(outcome, FillOutcome::NotFound);
    assert!(surface.journal().is_empty());
}

#[tokio::test]
async fn checkboxes_are_only_clicked_when_unchecked() {
    let surface = FakeSurface::new(vec![
        Node::new("ham", option_in_question("Toppings", CHECKBOX, "Ham")).toggle(true),
        Node::new("cheese", option_in_question("Toppings", CHECKBOX, "Cheese")).toggle(false),
    ]);
    let field = FieldSpec::new("Toppings", FieldKind::Checkbox, list(&["Ham", "cheese"]));

    assert_eq!(run(&surface, field.clone()).await, FillOutcome::Filled);
    assert_eq!(surface.clicks("ham"), 0);
    assert_eq!(surface.clicks("cheese"), 1);

    // a second pass leaves both boxes checked
    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert_eq!(surface.clicks("cheese"), 1);
    assert!(surface.checked("ham"));
    assert!(surface.checked("cheese"));
}

#[tokio::test]
async fn missing_checkbox_items_are_reported() {
    let surface = FakeSurface::new(vec![
        Node::new("ham", option_in_question("Toppings", CHECKBOX, "Ham")).toggle(false),
    ]);
    let partial = run(
        &surface,
        FieldSpec::new("Toppings", FieldKind::Checkbox, list(&["Ham", "Olives"])),
    )
    .await;
    assert_eq!(partial, FillOutcome::Partial { missing: vec!["Olives".into()] });

    let none = run(&surface, FieldSpec::new("Toppings", FieldKind::Checkbox, list(&["Olives"]))).await;
    assert_eq!(none, FillOutcome::NotFound);

    let empty = run(&surface, FieldSpec::new("Toppings", FieldKind::Checkbox, list(&[]))).await;
    assert!(matches!(empty, FillOutcome::Skipped(_)));
}

#[tokio::test]
async fn boolean_checkbox_sets_state() {
    let subscribe = matcher(|x| x.starts_with("//*[@role='checkbox']") && x.contains("='subscribe'"));
    let surface = FakeSurface::new(vec![Node::new("subscribe", subscribe).toggle(true)]);

    let outcome = run(&surface, FieldSpec::new("Subscribe", FieldKind::Checkbox, false)).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert!(!surface.checked("subscribe"));

    run(&surface, FieldSpec::new("Subscribe", FieldKind::Checkbox, false)).await;
    assert_eq!(surface.clicks("subscribe"), 1);
}

#[tokio::test]
async fn choice_by_entry_value() {
    let yes = matcher(|x| x.contains("@name='entry.5'") && x.contains("='yes'"));
    let surface = FakeSurface::new(vec![Node::new("yes", yes).toggle(false)]);
    let field = FieldSpec::new("Over 18?", FieldKind::Choice, "Yes").with_entry_id("5");

    assert_eq!(run(&surface, field.clone()).await, FillOutcome::Filled);
    assert_eq!(surface.journal(), vec!["scroll yes", "click yes"]);

    // already selected
    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert_eq!(surface.clicks("yes"), 1);
}

#[tokio::test]
async fn hidden_answer_input_is_not_the_option() {
    // Reads as already chosen, so picking it would skip the real radio.
    let answer = matcher(|x| {
        x.contains("@name='entry.5'") && x.contains("='yes'") && !x.contains("not(@type='hidden')")
    });
    let yes = matcher(|x| x.contains("@name='entry.5'") && x.contains("='yes'"));
    let surface = FakeSurface::new(vec![
        Node::new("answer", answer).toggle(true),
        Node::new("yes", yes).toggle(false),
    ]);
    let field = FieldSpec::new("Over 18?", FieldKind::Choice, "Yes").with_entry_id("5");

    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert!(surface.checked("yes"));
    assert_eq!(surface.clicks("answer"), 0);
}

fn date_parts(entry: &str) -> Vec<Node> {
    ["year", "month", "day"]
        .iter()
        .map(|suffix| Node::new(suffix, exact(composite_xpath(entry, suffix))))
        .collect()
}

#[tokio::test]
async fn composite_date_by_entry_id() {
    let surface = FakeSurface::new(date_parts("42"));
    let field = FieldSpec::new("Start", FieldKind::Date, "2025-06-09").with_entry_id("42");

    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert_eq!(surface.value_of("year"), "2025");
    assert_eq!(surface.value_of("month"), "6");
    assert_eq!(surface.value_of("day"), "9");
}

#[tokio::test]
async fn composite_time_by_entry_id() {
    let surface = FakeSurface::new(vec![
        Node::new("hour", exact(composite_xpath("8", "hour"))),
        Node::new("minute", exact(composite_xpath("8", "minute"))),
    ]);
    let field = FieldSpec::new("Arrival", FieldKind::Time, "09:05").with_entry_id("8");

    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert_eq!(surface.value_of("hour"), "9");
    assert_eq!(surface.value_of("minute"), "05");
}

#[tokio::test]
async fn composite_with_missing_parts() {
    let mut nodes = date_parts("42");
    nodes.pop();
    let surface = FakeSurface::new(nodes);
    let field = FieldSpec::new("Start", FieldKind::Date, "2025-06-09").with_entry_id("42");
    assert_eq!(run(&surface, field).await, FillOutcome::Partial { missing: vec!["day".into()] });

    let field = FieldSpec::new("Start", FieldKind::Date, "2025-06-09").with_entry_id("99");
    assert_eq!(run(&surface, field).await, FillOutcome::NotFound);
}

#[tokio::test]
async fn malformed_dates_and_times_are_skipped() {
    let surface = FakeSurface::new(date_parts("42"));
    for (kind, value) in [
        (FieldKind::Date, "2025-13-40"),
        (FieldKind::Date, "09/06/2025"),
        (FieldKind::Time, "9:45"),
        (FieldKind::Time, "25:00"),
    ] {
        let field = FieldSpec::new("Start", kind, value).with_entry_id("42");
        assert!(matches!(run(&surface, field).await, FillOutcome::Skipped(_)), "{value}");
    }
    assert!(surface.journal().is_empty());
}

#[tokio::test]
async fn date_without_entry_is_typed() {
    let surface = FakeSurface::new(vec![Node::new("start", aria(TEXT_INPUT, "Start date"))]);
    let field = FieldSpec::new("Start date", FieldKind::Date, " 2025-06-09 ");
    assert_eq!(run(&surface, field).await, FillOutcome::Filled);
    assert_eq!(surface.value_of("start"), "2025-06-09");
}

#[tokio::test]
async fn native_select_by_label() {
    let surface = FakeSurface::new(vec![
        Node::new("size", aria("select", "Size")).select_options(&["Small", "Large"]),
    ]);
    let outcome = run(&surface, FieldSpec::new("Size", FieldKind::Dropdown, "Large")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.value_of("size"), "Large");

    let outcome = run(&surface, FieldSpec::new("Size", FieldKind::Dropdown, "Huge")).await;
    assert_eq!(outcome, FillOutcome::OptionMissing("Huge".into()));
}

fn listbox_option(name: &str, text: &str) -> Node {
    Node::new(name, exact("//*[@role='option']"))
        .or(exact(format!("//*[@role='option'][normalize-space()='{text}']")))
        .text(text)
        .hidden()
}

fn colour_widget() -> FakeSurface {
    FakeSurface::new(vec![
        Node::new("colour", aria("*[@role='listbox']", "Colour"))
            .tag("div")
            .reveals(&["red", "blue"]),
        listbox_option("red", "Red"),
        listbox_option("blue", "Blue"),
    ])
}

#[tokio::test]
async fn custom_widget_matches_prefix() {
    let surface = colour_widget();
    let outcome = run(&surface, FieldSpec::new("Colour", FieldKind::Dropdown, "bl")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.clicks("blue"), 1);
    assert_eq!(surface.clicks("red"), 0);
}

#[tokio::test]
async fn custom_widget_without_the_option() {
    let surface = colour_widget();
    let outcome = run(&surface, FieldSpec::new("Colour", FieldKind::Dropdown, "Green")).await;
    assert_eq!(outcome, FillOutcome::OptionMissing("Green".into()));
    assert!(surface.journal().contains(&"key colour Escape".to_string()));
}

#[tokio::test]
async fn widget_without_options_is_typed() {
    let surface = FakeSurface::new(vec![Node::new("plan", after_label("Plan", "*[self::input"))]);
    let outcome = run(&surface, FieldSpec::new("Plan", FieldKind::Dropdown, "Pro")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(
        surface.journal(),
        vec!["click plan", "key plan Enter", "type plan Pro", "key plan Enter"]
    );
}

/// An option rendered inside `root` that also answers page-wide queries.
fn scoped_option(name: &str, root: &str, text: &str) -> Node {
    listbox_option(name, text).or(option_under(root, text))
}

#[tokio::test]
async fn options_are_read_from_the_opened_widget() {
    let shirt = "//*[@role='listbox'][@aria-label='Shirt colour']";
    let hat = "//*[@role='listbox'][@aria-label='Hat colour']";
    let surface = FakeSurface::new(vec![
        Node::new("shirt", exact(shirt)).tag("div").reveals(&["shirt-red", "shirt-blue"]),
        Node::new("hat", exact(hat)).tag("div").reveals(&["hat-red", "hat-blue"]),
        scoped_option("shirt-red", shirt, "Red"),
        scoped_option("shirt-blue", shirt, "Blue"),
        scoped_option("hat-red", hat, "Red"),
        scoped_option("hat-blue", hat, "Blue"),
    ]);

    let shirt_field = FieldSpec::new("Shirt colour", FieldKind::Dropdown, "Red");
    let hat_field = FieldSpec::new("Hat colour", FieldKind::Dropdown, "Blue");
    assert_eq!(run(&surface, shirt_field).await, FillOutcome::Filled);
    assert_eq!(run(&surface, hat_field).await, FillOutcome::Filled);

    assert_eq!(surface.clicks("shirt-red"), 1);
    assert_eq!(surface.clicks("hat-blue"), 1);
    assert_eq!(surface.clicks("shirt-blue"), 0);
    assert_eq!(surface.clicks("hat-red"), 0);
}

#[tokio::test]
async fn options_follow_aria_controls() {
    let popup = "//*[@id='menu-2']";
    let surface = FakeSurface::new(vec![
        Node::new("size", aria("*[@role='combobox']", "Size"))
            .tag("div")
            .attr("aria-controls", "menu-2")
            .reveals(&["menu-s", "menu-m"]),
        Node::new("other-m", exact("//*[@role='option']"))
            .or(exact("//*[@role='option'][normalize-space()='M']"))
            .text("M"),
        scoped_option("menu-s", popup, "S"),
        scoped_option("menu-m", popup, "M"),
    ]);

    let outcome = run(&surface, FieldSpec::new("Size", FieldKind::Dropdown, "M")).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.clicks("menu-m"), 1);
    assert_eq!(surface.clicks("other-m"), 0);
}

#[tokio::test]
async fn multi_select_reports_missing_choices() {
    let surface = FakeSurface::new(vec![
        Node::new("skills", aria("*[@role='listbox']", "Skills"))
            .tag("div")
            .reveals(&["rust", "sql"]),
        listbox_option("rust", "Rust"),
        listbox_option("sql", "SQL"),
    ]);
    let field = FieldSpec::new("Skills", FieldKind::MultiSelect, list(&["Rust", "Go"]));
    let outcome = run(&surface, field).await;
    assert_eq!(outcome, FillOutcome::Partial { missing: vec!["Go".into()] });
    assert_eq!(surface.clicks("rust"), 1);
    assert_eq!(surface.clicks("skills"), 2);
}

#[tokio::test]
async fn attachment_is_uploaded() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let surface = FakeSurface::new(vec![Node::new("resume", aria(FILE_INPUT, "Resume"))]);
    let path = file.path().to_string_lossy().to_string();

    let outcome = run(&surface, FieldSpec::new("Resume", FieldKind::Attachment, path)).await;
    assert_eq!(outcome, FillOutcome::Filled);
    assert_eq!(surface.files_of("resume"), vec![file.path().to_path_buf()]);
}

#[tokio::test]
async fn missing_attachment_aborts() {
    let surface = FakeSurface::new(vec![Node::new("resume", aria(FILE_INPUT, "Resume"))]);
    let field = FieldSpec::new("Resume", FieldKind::Attachment, "/no/such/cv.pdf");
    let err = fill(&surface, &field, &settings()).await.unwrap_err();
    assert!(matches!(err, Error::AttachmentMissing(_)));
    assert!(!err.is_field_local());
    assert!(surface.journal().is_empty());
}

#[tokio::test]
async fn unsupported_type_is_a_field_error() {
    let surface = FakeSurface::new(Vec::new());
    let field = FieldSpec::new("Rating", FieldKind::from("rating".to_string()), "5");
    let err = fill(&surface, &field, &settings()).await.unwrap_err();
    match &err {
        Error::UnsupportedFieldType { label, kind } => {
            assert_eq!(label, "Rating");
            assert_eq!(kind, "rating");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_field_local());
}
