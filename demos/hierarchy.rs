use dilation_primer::hierarchy::Cube;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cube = Cube::new(5u32);

    // invoke the area method in Rectangle
    println!("{}", cube.surface_area_from_rect());
    // invoke the area method in Square, which invokes the one in Rectangle
    println!("{}", cube.surface_area_from_square());
}
