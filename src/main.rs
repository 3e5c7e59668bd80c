fn main() -> anyhow::Result<()> {
    chat_scraper_lib::run()
}
