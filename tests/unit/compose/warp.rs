use super::*;

fn axis_aligned_quad() -> Quad {
    Quad::from_array([[40.0, 60.0], [240.0, 60.0], [240.0, 160.0], [40.0, 160.0]]).unwrap()
}

fn perspective_quad() -> Quad {
    Quad::from_array([[100.0, 100.0], [500.0, 140.0], [480.0, 600.0], [90.0, 560.0]]).unwrap()
}

fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, image::Rgba(px))
}

#[test]
fn rect_to_axis_aligned_quad_is_affine() {
    let h = Homography::rect_to_quad(200.0, 100.0, &axis_aligned_quad()).unwrap();
    assert!(h.is_affine());

    // Corners map exactly.
    let tl = h.apply(Point::new(0.0, 0.0));
    let br = h.apply(Point::new(200.0, 100.0));
    assert!((tl.x - 40.0).abs() < 1e-9 && (tl.y - 60.0).abs() < 1e-9);
    assert!((br.x - 240.0).abs() < 1e-9 && (br.y - 160.0).abs() < 1e-9);
}

#[test]
fn perspective_quad_maps_all_four_corners() {
    let quad = perspective_quad();
    let h = Homography::rect_to_quad(400.0, 500.0, &quad).unwrap();
    assert!(!h.is_affine());

    let src = [
        Point::new(0.0, 0.0),
        Point::new(400.0, 0.0),
        Point::new(400.0, 500.0),
        Point::new(0.0, 500.0),
    ];
    for (s, expected) in src.iter().zip(quad.corners.iter()) {
        let mapped = h.apply(*s);
        assert!((mapped.x - expected.x).abs() < 1e-6);
        assert!((mapped.y - expected.y).abs() < 1e-6);
    }
}

#[test]
fn inverse_round_trips_interior_points() {
    let h = Homography::rect_to_quad(400.0, 500.0, &perspective_quad()).unwrap();
    let inv = h.invert().unwrap();
    for p in [
        Point::new(13.0, 490.0),
        Point::new(200.0, 250.0),
        Point::new(399.0, 1.0),
    ] {
        let back = inv.apply(h.apply(p));
        assert!((back.x - p.x).abs() < 1e-6);
        assert!((back.y - p.y).abs() < 1e-6);
    }
}

#[test]
fn degenerate_quad_fails_the_solve() {
    // Bypass Quad::new validation to hit the solver's own singularity check.
    let collinear = Quad {
        corners: [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ],
    };
    let err = Homography::rect_to_quad(100.0, 100.0, &collinear);
    assert!(matches!(err, Err(MocksmithError::Geometry(_))));
}

#[test]
fn shrink_quad_preserves_centroid_and_scales_area() {
    let quad = perspective_quad();
    let shrunk = shrink_quad(&quad, 0.85).unwrap();

    let centroid = |q: &Quad| {
        (
            q.corners.iter().map(|p| p.x).sum::<f64>() / 4.0,
            q.corners.iter().map(|p| p.y).sum::<f64>() / 4.0,
        )
    };
    let (cx0, cy0) = centroid(&quad);
    let (cx1, cy1) = centroid(&shrunk);
    assert!((cx0 - cx1).abs() < 1e-9 && (cy0 - cy1).abs() < 1e-9);
    assert!((shrunk.area() - quad.area() * 0.85 * 0.85).abs() < 1e-6);
}

#[test]
fn shrink_quad_rejects_bad_factor() {
    assert!(shrink_quad(&perspective_quad(), 0.0).is_err());
    assert!(shrink_quad(&perspective_quad(), f64::NAN).is_err());
}

#[test]
fn warp_fills_inside_and_leaves_outside_transparent() {
    let design = solid(50, 50, [255, 0, 0, 255]);
    let quad = axis_aligned_quad();
    let out = warp_into_canvas(&design, &quad, 300, 200).unwrap();

    // Deep inside the quad: opaque red.
    assert_eq!(out.get_pixel(140, 110).0, [255, 0, 0, 255]);
    // Outside the bounding box: untouched transparent black.
    assert_eq!(out.get_pixel(10, 10).0, [0, 0, 0, 0]);
    assert_eq!(out.get_pixel(299, 199).0, [0, 0, 0, 0]);
}

#[test]
fn warp_of_axis_aligned_quad_has_sharp_extents() {
    let design = solid(10, 10, [0, 255, 0, 255]);
    let out = warp_into_canvas(&design, &axis_aligned_quad(), 300, 200).unwrap();
    // One pixel inside each edge is filled.
    assert_eq!(out.get_pixel(41, 61).0[3], 255);
    assert_eq!(out.get_pixel(239, 159).0[3], 255);
    // One pixel beyond each edge is empty.
    assert_eq!(out.get_pixel(39, 61).0[3], 0);
    assert_eq!(out.get_pixel(241, 159).0[3], 0);
}

#[test]
fn warp_rejects_degenerate_quads() {
    let tiny = Quad {
        corners: [
            Point::new(0.0, 0.0),
            Point::new(0.5, 0.0),
            Point::new(0.5, 0.5),
            Point::new(0.0, 0.5),
        ],
    };
    let design = solid(10, 10, [0, 0, 0, 255]);
    assert!(warp_into_canvas(&design, &tiny, 100, 100).is_err());
}

#[test]
fn bicubic_on_constant_image_returns_the_constant() {
    let img = solid(8, 8, [77, 88, 99, 255]);
    for (x, y) in [(0.5, 0.5), (4.0, 4.0), (7.5, 7.5), (3.3, 6.7)] {
        assert_eq!(sample_bicubic(&img, x, y), [77, 88, 99, 255]);
    }
}

#[test]
fn bicubic_at_pixel_centers_reproduces_samples() {
    let mut img = solid(4, 4, [0, 0, 0, 255]);
    img.put_pixel(2, 1, image::Rgba([200, 150, 100, 255]));
    let got = sample_bicubic(&img, 2.5, 1.5);
    assert_eq!(got, [200, 150, 100, 255]);
}
