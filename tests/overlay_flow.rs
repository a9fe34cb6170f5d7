use std::sync::Arc;

use overlay_translator_rust::fit::EstimatedMeasure;
use overlay_translator_rust::overlay::{BackgroundAction, Point, Size, ZoomDirection};
use overlay_translator_rust::translate::{LanguagePair, PassthroughTranslator, StaticDetector};
use overlay_translator_rust::{
    CancellationToken, OverlayController, OverlayPipeline, PipelineConfig, RecognitionOutcome,
    RecognizedFragment,
};

fn pipeline() -> OverlayPipeline {
    OverlayPipeline::new(
        Arc::new(StaticDetector::new(LanguagePair::new("de", "en"))),
        Some(Arc::new(PassthroughTranslator)),
        Arc::new(EstimatedMeasure),
        PipelineConfig::default(),
    )
}

fn outcome() -> RecognitionOutcome {
    RecognitionOutcome {
        success: true,
        text: "He llo Welt".to_string(),
        fragments: vec![
            RecognizedFragment::from_corners("He", 10, 10, 40, 30),
            RecognizedFragment::from_corners("llo", 42, 10, 70, 30),
            RecognizedFragment::from_corners("Welt", 10, 100, 70, 120),
        ],
    }
}

#[tokio::test]
async fn placements_json_snapshot() {
    let placements = pipeline()
        .place(outcome(), 96.0, 96.0, &CancellationToken::new())
        .await
        .expect("placements");
    let json = serde_json::to_string_pretty(&placements).expect("json");
    insta::assert_snapshot!(json, @r#"
    [
      {
        "text": "He llo",
        "bounds": {
          "left": 10.0,
          "top": 10.0,
          "width": 60.0,
          "height": 20.0
        },
        "fontSize": 15.0
      },
      {
        "text": "Welt",
        "bounds": {
          "left": 10.0,
          "top": 100.0,
          "width": 60.0,
          "height": 20.0
        },
        "fontSize": 15.0
      }
    ]
    "#);
}

#[tokio::test]
async fn placements_drive_an_interactive_surface() {
    let placements = pipeline()
        .place(outcome(), 192.0, 192.0, &CancellationToken::new())
        .await
        .expect("placements");

    let mut controller = OverlayController::new(Size::new(200.0, 120.0));
    let ids = controller.populate(&placements);
    assert_eq!(ids.len(), 2);

    // drag the first block right by 20
    assert!(controller.pointer_pressed(ids[0], Point::new(10.0, 10.0), 1));
    assert!(controller.pointer_moved(Point::new(30.0, 10.0)));
    assert!(controller.pointer_released());
    let moved = controller.element(ids[0]).expect("element");
    assert_eq!(moved.position(), Point::new(25.0, 5.0));

    // zoom keeps the block on the surface
    for _ in 0..30 {
        controller.zoom(ids[1], ZoomDirection::In);
    }
    let zoomed = controller.element(ids[1]).expect("element");
    assert!(zoomed.position().x + zoomed.size().width <= 200.0 + 1e-9);
    assert!(zoomed.position().y + zoomed.size().height <= 120.0 + 1e-9);

    // editing is exclusive across the surface
    assert!(controller.pointer_pressed(ids[0], Point::default(), 2));
    controller.edit_text(ids[0], "Hello");
    assert!(controller.pointer_pressed(ids[1], Point::default(), 2));
    assert_eq!(controller.active_editor(), Some(ids[1]));
    assert_eq!(controller.element(ids[0]).map(|e| e.text()), Some("Hello"));
    assert_eq!(
        controller
            .elements()
            .iter()
            .filter(|element| element.is_editing())
            .count(),
        1
    );

    assert_eq!(
        controller.background_pressed(2),
        BackgroundAction::CloseRequested
    );
    assert_eq!(controller.active_editor(), None);
}
