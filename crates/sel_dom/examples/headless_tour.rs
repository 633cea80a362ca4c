//! Headless Tour
//!
//! Builds a small page and drives it on a manual clock:
//! - a card fades in while its accent color tweens
//! - the window glides down to a section
//! - a progress ring fills up
//!
//! Run with: cargo run -p sel_dom --example headless_tour

use sel_dom::{AnimateOptions, CssProperties, Page, ProgressOptions, Result, ScrollToOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sel_dom=debug")),
        )
        .init();

    let (page, clock) = Page::headless();
    {
        let mut doc = page.document();
        let root = doc.root();
        let metrics = &mut doc.element_mut(root).unwrap().metrics;
        metrics.client_height = 600.0;
        metrics.scroll_height = 3000.0;

        let body = doc.body();
        let card = doc.append_element(body, "div")?;
        doc.element_mut(card).unwrap().set_attribute("class", "card");

        let section = doc.append_element(body, "section")?;
        let element = doc.element_mut(section).unwrap();
        element.set_attribute("id", "pricing");
        element.metrics.offset_top = 1800.0;

        let meter = doc.append_element(body, "div")?;
        doc.element_mut(meter).unwrap().set_attribute("id", "meter");
    }

    page.root().set_css_var("--accent", "#3366ff");

    let card = page.select(".card")?;
    card.animate(
        &CssProperties::from([("opacity", "0"), ("backgroundColor", "white")]),
        &CssProperties::from([("opacity", "1"), ("backgroundColor", "#3366ff")]),
        &AnimateOptions::new().with_duration(400.0).with_ease("easeOutCubic"),
    )?;
    page.window().scroll_to(
        &ScrollToOptions::new()
            .with_y("#pricing")
            .with_offset(0.0, -80.0)
            .smooth()
            .with_pps(2400.0),
    )?;
    page.select("#meter")?
        .progress(&ProgressOptions::new(72.0).with_stroke_color("#3366ff"))?;

    let frames = page.run_frames(&clock, 16.0, 1000);
    tracing::info!("settled after {} frames", frames);

    println!("card style: {:?}", card.attr("style"));
    {
        let doc = page.document();
        let top = doc.element(doc.root()).map_or(0.0, |root| root.scroll_top());
        println!("scroll top: {}", top);
    }
    println!("meter label: {:?}", page.select("#meter")?.text());
    println!("accent: {:?}", card.get_css_var("--accent"));
    Ok(())
}
