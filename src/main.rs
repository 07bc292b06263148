use panepeek::app::PanepeekApp;
use tracing_subscriber::EnvFilter;

fn main() {
    // mpv and the PDF scale maths expect '.' as the decimal separator.
    std::env::set_var("LC_NUMERIC", "C");
    unsafe {
        libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast());
    }

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "panepeek=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = PanepeekApp::new();
    std::process::exit(app.run());
}
