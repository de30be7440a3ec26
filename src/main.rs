use dcrps::{app, logger};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logger::init_logger();
    let res = app::run().await;
    if let Err(err) = res {
        std::process::exit(app::report_error(&err));
    }
}
