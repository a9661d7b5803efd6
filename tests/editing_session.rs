//! # Editing Session Tests
//!
//! Drives a document the way the editor does: render, hit-test the tree,
//! feed pointer events to the controller, fire node commands, then persist
//! and reload.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::rc::Rc;

use vitrine::config::InteractionConfig;
use vitrine::document::{Alignment, Document, Position};
use vitrine::interaction::{
    Command, CountingSurface, Hit, InteractionController, PointerEvent, PointerSurface, SlotPart,
    StateKind, Target,
};
use vitrine::render::{Composer, NodeKind, Rect, RenderMode, RenderTree};
use vitrine::snapshot;
use vitrine::template::{BuiltinTemplates, minimal_card, product_showcase};

fn slot_rect(tree: &RenderTree, key: &str) -> Rect {
    tree.nodes()
        .into_iter()
        .find(|n| matches!(&n.kind, NodeKind::SlotFrame { slot } if slot == key))
        .map(|n| n.rect)
        .expect("slot frame")
}

fn editable(controller: &InteractionController) -> RenderMode {
    RenderMode::Editable {
        focus: controller.focus(),
    }
}

fn down(tree: &RenderTree, x: f32, y: f32) -> PointerEvent {
    PointerEvent::Down {
        hit: tree.hit_test(x, y),
        x: x as i32,
        y: y as i32,
    }
}

#[test]
fn fill_slot_resize_is_stored_through_its_handle() {
    let template = product_showcase();
    let composer = Composer::new(&template);
    let mut doc = Document::from_template(&template, &HashMap::new());
    let counter = CountingSurface::new();
    let surface: Rc<dyn PointerSurface> = counter.clone();
    let mut controller = InteractionController::new(InteractionConfig::default(), surface);

    let tree = composer.render(&doc, &editable(&controller));
    let rect = slot_rect(&tree, "hero_image");
    let (cx, cy) = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
    controller.handle(&mut doc, down(&tree, cx, cy));
    assert_eq!(controller.focus(), Some(Target::Slot("hero_image".into())));

    let tree = composer.render(&doc, &editable(&controller));
    let rect = slot_rect(&tree, "hero_image");
    let (hx, hy) = (rect.right().floor(), rect.bottom().floor());
    assert_eq!(controller.handle(&mut doc, down(&tree, hx, hy)), StateKind::Resizing);
    controller.handle(
        &mut doc,
        PointerEvent::Up {
            x: hx as i32 + 50,
            y: hy as i32 + 50,
        },
    );
    assert!((doc.get_slot("hero_image").size_percent - 115.0).abs() < 1e-9);

    // Stored, but the fill slot still spans its container.
    let after = composer.render(&doc, &RenderMode::Frozen);
    let before = composer.render(
        &Document::from_template(&template, &HashMap::new()),
        &RenderMode::Frozen,
    );
    assert_eq!(slot_rect(&after, "hero_image"), slot_rect(&before, "hero_image"));
    let restored = snapshot::deserialize(&snapshot::serialize(&doc), &template);
    assert_eq!(restored.get_slot("hero_image").size_percent, 115.0);
}

#[test]
fn resize_move_and_align_through_the_render_tree() {
    let template = product_showcase();
    let composer = Composer::new(&template);
    let mut doc = Document::from_template(&template, &HashMap::new());
    let counter = CountingSurface::new();
    let surface: Rc<dyn PointerSurface> = counter.clone();
    let mut controller = InteractionController::new(InteractionConfig::default(), surface);

    // First click focuses
    let tree = composer.render(&doc, &editable(&controller));
    let rect = slot_rect(&tree, "feature_image_1");
    let (cx, cy) = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
    assert_eq!(controller.handle(&mut doc, down(&tree, cx, cy)), StateKind::Focused);
    controller.handle(&mut doc, PointerEvent::Up { x: cx as i32, y: cy as i32 });
    assert_eq!(controller.focus(), Some(Target::Slot("feature_image_1".into())));

    // Bottom-right handle: +50 on both axes is +15%
    let tree = composer.render(&doc, &editable(&controller));
    let rect = slot_rect(&tree, "feature_image_1");
    let (hx, hy) = (rect.right().floor(), rect.bottom().floor());
    assert_eq!(
        tree.hit_test(hx, hy),
        Hit::Slot {
            key: "feature_image_1".into(),
            part: SlotPart::Handle(vitrine::interaction::Corner::BottomRight),
        }
    );
    assert_eq!(controller.handle(&mut doc, down(&tree, hx, hy)), StateKind::Resizing);
    assert_eq!(counter.active(), 1);
    controller.handle(
        &mut doc,
        PointerEvent::Move {
            x: hx as i32 + 50,
            y: hy as i32 + 50,
        },
    );
    controller.handle(
        &mut doc,
        PointerEvent::Up {
            x: hx as i32 + 50,
            y: hy as i32 + 50,
        },
    );
    assert_eq!(controller.state(), StateKind::Idle);
    assert_eq!(counter.active(), 0);
    assert!((doc.get_slot("feature_image_1").size_percent - 115.0).abs() < 1e-9);

    // Refocus, then drag the body
    let tree = composer.render(&doc, &editable(&controller));
    let rect = slot_rect(&tree, "feature_image_1");
    let (cx, cy) = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
    controller.handle(&mut doc, down(&tree, cx, cy));
    let tree = composer.render(&doc, &editable(&controller));
    assert_eq!(controller.handle(&mut doc, down(&tree, cx, cy)), StateKind::Moving);
    controller.handle(
        &mut doc,
        PointerEvent::Up {
            x: cx as i32 - 20,
            y: cy as i32 + 5,
        },
    );
    assert_eq!(doc.get_slot("feature_image_1").position, Position::new(-20, 5));

    // Alignment controls carry their own command
    controller.handle(&mut doc, down(&tree, cx, cy));
    let tree = composer.render(&doc, &editable(&controller));
    let align_left = tree
        .nodes()
        .into_iter()
        .find_map(|n| match (&n.kind, &n.command) {
            (
                NodeKind::AlignControl {
                    alignment: Alignment::Left,
                    ..
                },
                Some(command),
            ) => Some(command.clone()),
            _ => None,
        })
        .expect("left align control");
    assert!(controller.apply(&mut doc, align_left));
    assert_eq!(doc.get_slot("feature_image_1").alignment, Alignment::Left);

    // Everything survives a snapshot round trip
    let json = snapshot::serialize(&doc).to_json().unwrap();
    let restored = snapshot::load_document(Some(&json), "product-showcase", &BuiltinTemplates::new());
    assert_eq!(restored, doc);
    assert_eq!(
        slot_rect(&composer.render(&restored, &RenderMode::Frozen), "feature_image_1"),
        slot_rect(&composer.render(&doc, &RenderMode::Frozen), "feature_image_1")
    );
}

#[test]
fn extra_slots_and_sections_round_trip() {
    let template = product_showcase();
    let surface: Rc<dyn PointerSurface> = CountingSurface::new();
    let mut controller = InteractionController::new(InteractionConfig::default(), surface);
    let mut doc = Document::from_template(&template, &HashMap::new());

    for i in 0..3 {
        assert!(controller.apply(&mut doc, Command::AddExtraSlot));
        doc.set_slot_url(&format!("extra_image_{i}"), Some(format!("https://img/{i}.png")));
    }
    assert!(controller.apply(
        &mut doc,
        Command::DeleteImage {
            slot: "extra_image_1".into()
        }
    ));
    assert_eq!(doc.extra_slot_count(), 2);
    assert_eq!(
        doc.get_slot("extra_image_1").url.as_deref(),
        Some("https://img/2.png")
    );

    assert!(controller.apply(
        &mut doc,
        Command::RemoveSection {
            section: "specs".into()
        }
    ));
    assert!(!doc.is_section_visible("specs"));

    let restored = snapshot::deserialize(&snapshot::serialize(&doc), &template);
    assert_eq!(restored, doc);

    // Hidden sections stay out of the frozen render
    let tree = Composer::new(&template).render(&restored, &RenderMode::Frozen);
    assert!(!tree.nodes().iter().any(|n| matches!(
        &n.kind,
        NodeKind::Section { key } if key == "specs"
    )));
}

#[test]
fn malformed_snapshot_degrades_to_defaults() {
    let templates = BuiltinTemplates::new();
    let doc = snapshot::load_document(Some("{not json"), "minimal-card", &templates);
    assert_eq!(doc, Document::from_template(&minimal_card(), &HashMap::new()));

    let doc = snapshot::load_document(Some(r#"{"templateId": "retired-layout"}"#), "minimal-card", &templates);
    assert_eq!(doc.template_id, "retired-layout");
    assert!(doc.sections.is_empty());
}
