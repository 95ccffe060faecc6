//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Fetch every post from the CMS and render the static site
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let source = blog.content_source()?;
    let generator = Generator::new(blog)?;
    let report = generator.generate(&source).await?;

    if !report.skipped.is_empty() {
        tracing::warn!(
            "{} posts were skipped: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
