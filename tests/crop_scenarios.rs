use inktex::overlay::crop::{compute_bounds, crop_to_image, BoundingBox, CropTuning};
use inktex::overlay::model::{BrushStyle, CanvasSize, InkColor, Point, Stroke};
use inktex::overlay::raster::RasterCanvas;
use inktex::overlay::store::StrokeStore;

fn ink() -> BrushStyle {
    BrushStyle {
        width: 3,
        color: InkColor::INK_BLUE,
    }
}

fn committed_stroke(store: &mut StrokeStore, from: (i32, i32), to: (i32, i32)) {
    store.begin_stroke(Point::new(from.0, from.1));
    store.extend_stroke(Point::new(to.0, to.1));
    assert!(store.commit_stroke());
}

#[test]
fn small_mark_near_origin_yields_the_clamped_minimum_box() {
    let canvas = CanvasSize::new(800, 600);
    let stroke = Stroke::from_points(vec![Point::new(10, 10), Point::new(50, 50)]).expect("stroke");

    let bounds = compute_bounds(&[stroke], canvas, CropTuning::default()).expect("bounds");
    assert_eq!(
        bounds,
        BoundingBox {
            x: 0,
            y: 0,
            width: 100,
            height: 100
        }
    );
}

#[test]
fn any_nonempty_stroke_set_meets_the_minimum_recognition_size() {
    let canvas = CanvasSize::new(800, 600);
    for (from, to) in [((5, 5), (8, 8)), ((700, 500), (790, 590)), ((300, 10), (302, 11))] {
        let stroke =
            Stroke::from_points(vec![Point::new(from.0, from.1), Point::new(to.0, to.1)])
                .expect("stroke");
        let bounds = compute_bounds(&[stroke], canvas, CropTuning::default()).expect("bounds");
        assert!(bounds.width >= 100, "width {} too small", bounds.width);
        assert!(bounds.height >= 100, "height {} too small", bounds.height);
    }
}

#[test]
fn crop_is_exactly_sized_and_white_backed() {
    let mut raster = RasterCanvas::new(400, 300);
    raster.append_segment(Point::new(150, 150), Point::new(190, 150), ink());

    let bounds = BoundingBox {
        x: 120,
        y: 120,
        width: 130,
        height: 110,
    };
    let image = crop_to_image(&raster, Some(bounds), None);
    assert_eq!(image.dimensions(), (130, 110));
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(image.get_pixel(129, 109).0, [255, 255, 255, 255]);
    assert_eq!(image.get_pixel(50, 30).0, [0, 0, 255, 255]);
}

#[test]
fn replaying_the_same_stroke_sequence_is_deterministic() {
    let mut store = StrokeStore::new(CanvasSize::new(200, 200));
    committed_stroke(&mut store, (20, 20), (80, 20));
    committed_stroke(&mut store, (20, 60), (80, 100));

    let mut first = RasterCanvas::new(200, 200);
    first.full_redraw(store.strokes(), None, ink());
    let mut second = RasterCanvas::new(200, 200);
    second.full_redraw(store.strokes(), None, ink());
    assert_eq!(first, second);

    // Redrawing over a dirty buffer converges to the same raster.
    first.append_segment(Point::new(0, 0), Point::new(199, 199), ink());
    first.full_redraw(store.strokes(), None, ink());
    assert_eq!(first, second);
}

#[test]
fn undo_leaves_the_raster_of_the_remaining_strokes() {
    let mut store = StrokeStore::new(CanvasSize::new(200, 200));
    committed_stroke(&mut store, (20, 20), (80, 20));
    committed_stroke(&mut store, (20, 60), (80, 60));
    committed_stroke(&mut store, (20, 100), (80, 100));

    assert!(store.undo());
    let mut after_undo = RasterCanvas::new(200, 200);
    after_undo.full_redraw(store.strokes(), None, ink());

    let s1 = Stroke::from_points(vec![Point::new(20, 20), Point::new(80, 20)]).expect("stroke");
    let s2 = Stroke::from_points(vec![Point::new(20, 60), Point::new(80, 60)]).expect("stroke");
    let mut expected = RasterCanvas::new(200, 200);
    expected.full_redraw(&[s1, s2], None, ink());

    assert_eq!(after_undo, expected);
}

#[test]
fn empty_store_produces_no_bounds() {
    let store = StrokeStore::new(CanvasSize::new(200, 200));
    assert_eq!(
        compute_bounds(store.strokes(), store.region(), CropTuning::default()),
        None
    );
}
