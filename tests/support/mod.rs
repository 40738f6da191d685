//! In-memory page for driving the locator, filler and submission driver
//! without a browser. Nodes answer to XPath/CSS queries through predicates;
//! every interaction lands in a shared journal.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use agentic_forms::locator::xpath_literal;
use agentic_forms::surface::{Control, Surface};
use agentic_forms::{Error, FillSettings, Result};
use async_trait::async_trait;

pub type Matcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Node test the locator emits for text inputs.
pub const TEXT_INPUT: &str = "input[not(@type)";
pub const RADIO: &str = "*[@role='radio']";
pub const CHECKBOX: &str = "*[@role='checkbox']";
pub const SELECT: &str = "select[";
pub const FILE_INPUT: &str = "input[@type='file']";

pub fn matcher(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Matcher {
    Arc::new(f)
}

pub fn exact(xpath: impl Into<String>) -> Matcher {
    let xpath = xpath.into();
    matcher(move |x| x == xpath)
}

/// `//<test>...[@aria-label='<label>']`
pub fn aria(test: &str, label: &str) -> Matcher {
    let prefix = format!("//{test}");
    let suffix = format!("[@aria-label={}]", xpath_literal(label));
    matcher(move |x| x.starts_with(&prefix) && x.ends_with(&suffix))
}

/// A control inside the `div[role=listitem]` whose text is `question`.
pub fn in_question(question: &str, test: &str) -> Matcher {
    let prefix = format!(
        "//div[@role='listitem' and .//*[normalize-space()={}]]//{test}",
        xpath_literal(question)
    );
    matcher(move |x| x.starts_with(&prefix))
}

/// A radio/checkbox option inside a question, named case-insensitively.
pub fn option_in_question(question: &str, test: &str, option: &str) -> Matcher {
    let container = in_question(question, test);
    let name = format!("={}", xpath_literal(&option.to_ascii_lowercase()));
    matcher(move |x| container(x) && x.contains("translate(@aria-label") && x.contains(&name))
}

/// The control following a `<label>` with exactly this text.
pub fn after_label(label: &str, test: &str) -> Matcher {
    let xpath = format!("//label[normalize-space()={}]/following::{test}", xpath_literal(label));
    matcher(move |x| x.starts_with(&xpath))
}

/// A Google-style `div[role=button]` or a native button with this text.
pub fn button(text: &str) -> Matcher {
    let lit = xpath_literal(text);
    let div = format!("//div[@role='button' and .//span[normalize-space()={lit}]]");
    let native = format!("//button[normalize-space()={lit}]");
    matcher(move |x| x.contains(&div) || x.contains(&native))
}

/// An option inside the subtree rooted at `root` (an XPath); answers both
/// the listing query and the click on its own text.
pub fn option_under(root: &str, text: &str) -> Matcher {
    let listing = format!("{root}//*[@role='option']");
    let own = format!("{listing}[normalize-space()={}]", xpath_literal(text));
    matcher(move |x| x == listing || x == own)
}

/// Matches the input count query used by the success heuristics.
pub fn any_input() -> Matcher {
    exact("//input[not(@type='hidden')] | //textarea")
}

#[derive(Clone)]
pub struct Node {
    pub name: String,
    matchers: Vec<Matcher>,
    css: Option<String>,
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    value: String,
    checked: bool,
    toggles: bool,
    visible: bool,
    select_options: Vec<String>,
    reveals: Vec<String>,
    hides_on_click: bool,
    body_on_click: Option<String>,
    url_on_click: Option<String>,
    clear_fails: bool,
    clicks: usize,
    files: Vec<PathBuf>,
}

impl Node {
    pub fn new(name: &str, m: Matcher) -> Self {
        Self {
            name: name.to_string(),
            matchers: vec![m],
            css: None,
            tag: "input".into(),
            attrs: Vec::new(),
            text: String::new(),
            value: String::new(),
            checked: false,
            toggles: false,
            visible: true,
            select_options: Vec::new(),
            reveals: Vec::new(),
            hides_on_click: false,
            body_on_click: None,
            url_on_click: None,
            clear_fails: false,
            clicks: 0,
            files: Vec::new(),
        }
    }

    /// Also answer to another query.
    pub fn or(mut self, m: Matcher) -> Self {
        self.matchers.push(m);
        self
    }

    pub fn css(mut self, selector: &str) -> Self {
        self.css = Some(selector.into());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.into();
        self
    }

    /// A checkbox/radio: clicking flips `checked`.
    pub fn toggle(mut self, checked: bool) -> Self {
        self.toggles = true;
        self.checked = checked;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn select_options(mut self, options: &[&str]) -> Self {
        self.tag = "select".into();
        self.select_options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn reveals(mut self, names: &[&str]) -> Self {
        self.reveals = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn hides_on_click(mut self) -> Self {
        self.hides_on_click = true;
        self
    }

    pub fn body_on_click(mut self, body: &str) -> Self {
        self.body_on_click = Some(body.into());
        self
    }

    pub fn url_on_click(mut self, url: &str) -> Self {
        self.url_on_click = Some(url.into());
        self
    }

    pub fn clear_fails(mut self) -> Self {
        self.clear_fails = true;
        self
    }

    fn answers(&self, xpath: &str) -> bool {
        self.visible && self.matchers.iter().any(|m| m(xpath))
    }
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    journal: Vec<String>,
    url: String,
    body: String,
}

#[derive(Clone, Default)]
pub struct FakeSurface {
    state: Arc<Mutex<State>>,
}

impl FakeSurface {
    pub fn new(nodes: Vec<Node>) -> Self {
        let surface = Self::default();
        surface.lock().nodes = nodes;
        surface
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_body(self, body: &str) -> Self {
        self.lock().body = body.into();
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.lock().url = url.into();
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    fn node<T>(&self, name: &str, f: impl FnOnce(&Node) -> T) -> T {
        let state = self.lock();
        let node = state
            .nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("no node named {name}"));
        f(node)
    }

    pub fn value_of(&self, name: &str) -> String {
        self.node(name, |n| n.value.clone())
    }

    pub fn checked(&self, name: &str) -> bool {
        self.node(name, |n| n.checked)
    }

    pub fn clicks(&self, name: &str) -> usize {
        self.node(name, |n| n.clicks)
    }

    pub fn files_of(&self, name: &str) -> Vec<PathBuf> {
        self.node(name, |n| n.files.clone())
    }

    fn control(&self, index: usize) -> FakeControl {
        FakeControl {
            state: Arc::clone(&self.state),
            index,
        }
    }
}

#[async_trait]
impl Surface for FakeSurface {
    type Control = FakeControl;

    async fn find(&self, xpath: &str) -> Result<Option<FakeControl>> {
        let index = self.lock().nodes.iter().position(|n| n.answers(xpath));
        Ok(index.map(|i| self.control(i)))
    }

    async fn find_css(&self, selector: &str) -> Result<Option<FakeControl>> {
        let index = self
            .lock()
            .nodes
            .iter()
            .position(|n| n.visible && n.css.as_deref() == Some(selector));
        Ok(index.map(|i| self.control(i)))
    }

    async fn count(&self, xpath: &str) -> Result<usize> {
        Ok(self.lock().nodes.iter().filter(|n| n.answers(xpath)).count())
    }

    async fn texts(&self, xpath: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .nodes
            .iter()
            .filter(|n| n.answers(xpath) && !n.text.is_empty())
            .map(|n| n.text.clone())
            .collect())
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.lock().body.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.url = url.to_string();
        state.journal.push(format!("goto {url}"));
        Ok(())
    }

    async fn run_script(&self, _script: &str) -> Result<()> {
        self.lock().journal.push("script".into());
        Ok(())
    }

    async fn pause(&self, _duration: Duration) {}
}

pub struct FakeControl {
    state: Arc<Mutex<State>>,
    index: usize,
}

impl FakeControl {
    fn with<T>(&self, f: impl FnOnce(&mut State, usize) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state, self.index)
    }
}

#[async_trait]
impl Control for FakeControl {
    async fn click(&self) -> Result<()> {
        self.with(|state, i| {
            let node = &mut state.nodes[i];
            node.clicks += 1;
            if node.toggles {
                node.checked = !node.checked;
            }
            if node.hides_on_click {
                node.visible = false;
            }
            let name = node.name.clone();
            let reveals = node.reveals.clone();
            let body = node.body_on_click.clone();
            let url = node.url_on_click.clone();

            for other in state.nodes.iter_mut().filter(|n| reveals.contains(&n.name)) {
                other.visible = true;
            }
            if let Some(body) = body {
                state.body = body;
            }
            if let Some(url) = url {
                state.url = url;
            }
            state.journal.push(format!("click {name}"));
        });
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.with(|state, i| {
            let node = &mut state.nodes[i];
            if node.clear_fails {
                return Err(Error::JsError("cannot clear".into()));
            }
            node.value.clear();
            let name = node.name.clone();
            state.journal.push(format!("clear {name}"));
            Ok(())
        })
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.with(|state, i| {
            let node = &mut state.nodes[i];
            node.value.push_str(text);
            let name = node.name.clone();
            state.journal.push(format!("type {name} {text}"));
        });
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.with(|state, i| {
            let name = state.nodes[i].name.clone();
            state.journal.push(format!("key {name} {key}"));
        });
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.with(|state, i| {
            state.nodes[i]
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        }))
    }

    async fn value(&self) -> Result<String> {
        Ok(self.with(|state, i| state.nodes[i].value.clone()))
    }

    async fn tag_name(&self) -> Result<String> {
        Ok(self.with(|state, i| state.nodes[i].tag.clone()))
    }

    async fn is_checked(&self) -> Result<bool> {
        Ok(self.with(|state, i| state.nodes[i].checked))
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.with(|state, i| {
            let name = state.nodes[i].name.clone();
            state.journal.push(format!("scroll {name}"));
        });
        Ok(())
    }

    async fn select_option_by_label(&self, label: &str) -> Result<bool> {
        Ok(self.with(|state, i| {
            let node = &mut state.nodes[i];
            if node.select_options.iter().any(|o| o == label) {
                node.value = label.to_string();
                true
            } else {
                false
            }
        }))
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<()> {
        self.with(|state, i| {
            state.nodes[i].files = paths.to_vec();
            let name = state.nodes[i].name.clone();
            state.journal.push(format!("files {name}"));
        });
        Ok(())
    }
}

/// Default timings; the fake's pauses are no-ops so polls finish at once.
pub fn settings() -> FillSettings {
    FillSettings::default()
}
