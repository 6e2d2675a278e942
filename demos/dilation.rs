use dilation_primer::backend::{set_backend, Backend};
use dilation_primer::demo::DilationDemo;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_backend(Backend::from_env());

    // dilation = 1 ~ normal convolution
    let report = DilationDemo::default().run()?;

    println!("\x1b[1m Input Tensor:\x1b[0m {}", report.input);
    println!("shape = {:?}", report.input.shape);

    for run in &report.runs {
        if run.step.dilation == 1 {
            println!("\x1b[1m Output Tensor:\x1b[0m {}", run.output);
        } else {
            println!(
                "\x1b[1m Output Tensor \x1b[0m (dilation = {}): {}",
                run.step.dilation, run.output
            );
        }
        println!("shape = {:?}", run.output.shape);
    }

    Ok(())
}
