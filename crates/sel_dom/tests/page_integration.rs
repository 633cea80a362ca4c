//! Page-level scenarios combining selection, events and the animated helpers
//!
//! Each test builds a small headless page, drives frames on a manual clock
//! and checks the document state the user would observe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sel_dom::{
    AnimateOptions, CssProperties, Listener, Page, ProgressOptions, RunState, ScrollToOptions,
};

fn counter() -> (Arc<AtomicUsize>, Listener) {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = count.clone();
    let listener = Listener::new(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    (count, listener)
}

/// A list of three items inside a tall scrolling window
fn list_page() -> (Page, sel_animation::ManualClock) {
    let (page, clock) = Page::headless();
    {
        let mut doc = page.document();
        let root = doc.root();
        let metrics = &mut doc.element_mut(root).unwrap().metrics;
        metrics.client_height = 200.0;
        metrics.scroll_height = 1200.0;

        let body = doc.body();
        let list = doc.append_element(body, "ul").unwrap();
        doc.element_mut(list).unwrap().set_attribute("id", "todo");
        for (index, label) in ["write", "review", "ship"].into_iter().enumerate() {
            let item = doc.append_element(list, "li").unwrap();
            let element = doc.element_mut(item).unwrap();
            element.set_attribute("id", &format!("item-{index}"));
            element.set_attribute("class", "item");
            element.metrics.offset_top = 400.0 * index as f32;
            doc.set_text_content(item, label);
        }
    }
    (page, clock)
}

#[test]
fn test_fade_out_then_remove_on_click() {
    let (page, clock) = list_page();
    let items = page.select("#todo > .item").unwrap();
    assert_eq!(items.len(), 3);

    let (clicks, listener) = counter();
    page.select("#todo").unwrap().on("click", &listener).unwrap();
    page.select(".item").unwrap().trigger("click").unwrap();
    assert_eq!(clicks.load(Ordering::SeqCst), 3);

    let group = items
        .animate(
            &CssProperties::from([("opacity", "1")]),
            &CssProperties::from([("opacity", "0")]),
            &AnimateOptions::new()
                .with_duration(150.0)
                .with_ease("linear")
                .with_clean_up(true)
                .with_display_none(true),
        )
        .unwrap();
    assert_eq!(group.len(), 3);

    page.run_frames(&clock, 16.0, 100);
    assert!(group.is_finished());
    assert_eq!(items.get_style("opacity"), None);
    assert_eq!(items.get_style("display").as_deref(), Some("none"));

    items.remove();
    assert!(page.select(".item").unwrap().is_empty());
    assert_eq!(page.select("#todo").unwrap().html().as_deref(), Some(""));
}

#[test]
fn test_smooth_scroll_to_item_reports_every_frame() {
    let (page, clock) = list_page();
    let window = page.window();
    let (scrolls, listener) = counter();
    window.on("scroll", &listener).unwrap();

    let group = window
        .scroll_to(
            &ScrollToOptions::from_json(
                r##"{"y": "#item-2", "offsetY": -50, "behavior": "smooth", "pps": 1000}"##,
            )
            .unwrap(),
        )
        .unwrap();

    let frames = page.run_frames(&clock, 20.0, 200);
    assert!(frames > 1);
    assert!(group.is_finished());
    assert_eq!(scrolls.load(Ordering::SeqCst), frames);

    let doc = page.document();
    let root = doc.element(doc.root()).unwrap();
    assert_eq!(root.scroll_top(), 750.0);
}

#[test]
fn test_scroll_to_element_handle_is_clamped() {
    let (page, clock) = list_page();
    let window = page.window();
    let last = {
        let doc = page.document();
        let list = doc.get_element_by_id("todo").unwrap();
        *doc.children(list).last().unwrap()
    };

    let group = window
        .scroll_to(
            &ScrollToOptions::new()
                .with_y(last)
                .with_offset(0.0, 500.0)
                .smooth()
                .with_pps(1500.0),
        )
        .unwrap();
    assert_eq!(group.len(), 1);

    page.run_frames(&clock, 16.0, 200);
    let handle = &group.handles()[0];
    assert_eq!(handle.state(), RunState::Completed);

    let doc = page.document();
    let root = doc.element(doc.root()).unwrap();
    assert_eq!(root.scroll_top(), 1000.0);
}

#[test]
fn test_progress_ring_counts_up() {
    let (page, clock) = list_page();
    let target = {
        let mut doc = page.document();
        let body = doc.body();
        let meter = doc.append_element(body, "div").unwrap();
        doc.element_mut(meter).unwrap().set_attribute("id", "meter");
        meter
    };
    let meter = page.select(target).unwrap();
    let group = meter
        .progress(&ProgressOptions::from_json(r#"{"input": 64, "text": "{input} done"}"#).unwrap())
        .unwrap();
    assert_eq!(meter.text().as_deref(), Some("0 done"));

    page.run_frames(&clock, 16.0, 500);
    assert!(group.is_finished());
    assert_eq!(meter.text().as_deref(), Some("64 done"));
}

#[test]
fn test_removing_container_stops_its_runs() {
    let (page, clock) = list_page();
    let items = page.select(".item").unwrap();
    let group = items
        .animate(
            &CssProperties::new(),
            &CssProperties::from([("margin-left", "40px")]),
            &AnimateOptions::new().with_duration(1000.0).with_repeat(-1),
        )
        .unwrap();

    page.run_frames(&clock, 16.0, 10);
    page.select("#todo").unwrap().remove();
    page.tick();

    assert!(group.is_finished());
    assert!(group.handles().iter().all(|h| h.state() == RunState::Cancelled));
    assert!(!page.scheduler().has_active_runs());
}
