use requests::{api, RequestOptions, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: wget <url> [file]"))?;
    let file = args.next().unwrap_or_else(|| "download.out".to_owned());

    let written = api::wget(&url, &file).await?;
    println!("saved {written} bytes to {file}");

    let mut session = Session::from_env()?;
    session.set_header("user-agent", "requests-wget/0.1");
    session.debug_trace(RequestOptions::head(url)).await?;

    Ok(())
}
