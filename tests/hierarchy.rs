use dilation_primer::hierarchy::{Area, Cube, Rectangle, Square};

#[test]
fn test_rectangle_area() {
    assert_eq!(Rectangle::new(3u32, 4).area(), 12);
    assert_eq!(Rectangle::new(2.5f64, 2.0).area(), 5.0);
}

#[test]
fn test_square_builds_its_rectangle() {
    let square = Square::new(5u32);
    assert_eq!(*square.as_rectangle(), Rectangle::new(5, 5));
    assert_eq!(square.side(), 5);
    assert_eq!(square.area(), Rectangle::new(5, 5).area());
}

#[test]
fn test_cube_from_rect_skips_square() {
    let cube = Cube::new(5u32);
    assert_eq!(cube.surface_area_from_rect(), Rectangle::new(5, 5).area());
    assert_eq!(cube.surface_area_from_rect(), 25);
}

#[test]
fn test_cube_from_square_chains_to_rectangle() {
    let cube = Cube::new(5u32);
    assert_eq!(cube.surface_area_from_square(), Square::new(5).area());
    assert_eq!(cube.surface_area_from_square(), Rectangle::new(5, 5).area());
    assert_eq!(cube.surface_area_from_square(), 25);
}

#[test]
fn test_cube_area_resolves_to_square() {
    let cube = Cube::new(7u64);
    assert_eq!(cube.area(), cube.as_square().area());
    assert_eq!(cube.area(), 49);
    assert_eq!(cube.side(), 7);
    assert_eq!(cube.as_rectangle(), cube.as_square().as_rectangle());
}

#[test]
fn test_labels() {
    assert_eq!(
        <Rectangle<u32> as Area>::LABEL,
        Some("Calculate from Rectangle!")
    );
    assert_eq!(<Square<u32> as Area>::LABEL, Some("Calculate from Square!"));
    assert_eq!(<Cube<u32> as Area>::LABEL, None);
}

#[test]
fn test_generic_over_levels() {
    fn total<A: Area<Output = u32>>(levels: &[A]) -> u32 {
        levels.iter().map(Area::area).sum()
    }
    assert_eq!(total(&[Cube::new(2), Cube::new(3)]), 13);
}

fn labels_of(run: impl FnOnce(&mut Vec<u8>) -> u32) -> (u32, Vec<String>) {
    let mut out = Vec::new();
    let area = run(&mut out);
    let text = String::from_utf8(out).unwrap();
    (area, text.lines().map(str::to_owned).collect())
}

#[test]
fn test_from_square_prints_square_then_rectangle() {
    let cube = Cube::new(5u32);
    let (area, lines) = labels_of(|out| cube.surface_area_from_square_to(out));
    assert_eq!(area, 25);
    assert_eq!(lines, ["Calculate from Square!", "Calculate from Rectangle!"]);
}

#[test]
fn test_from_rect_prints_only_rectangle() {
    let cube = Cube::new(5u32);
    let (area, lines) = labels_of(|out| cube.surface_area_from_rect_to(out));
    assert_eq!(area, 25);
    assert_eq!(lines, ["Calculate from Rectangle!"]);
}

#[test]
fn test_cube_area_prints_no_label_of_its_own() {
    let (area, lines) = labels_of(|out| Cube::new(3u32).area_to(out));
    assert_eq!(area, 9);
    assert_eq!(lines, ["Calculate from Square!", "Calculate from Rectangle!"]);
}

#[test]
fn test_failed_label_write_keeps_the_area() {
    struct Broken;
    impl std::io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    assert_eq!(Cube::new(4u32).surface_area_from_square_to(&mut Broken), 16);
}
