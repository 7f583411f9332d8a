fn main() -> anyhow::Result<()> {
    // Values from .env become ordinary environment variables
    dotenvy::dotenv().ok();

    let config = video_downloader_lib::AppConfig::load()?;
    video_downloader_lib::run(config)
}
