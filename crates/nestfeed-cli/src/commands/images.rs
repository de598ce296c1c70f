use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;

use nestfeed_core::{AppConfig, HttpListingSource, ImageGallery, ResourceCache};

pub async fn run(config: &AppConfig, ids: &[String], repeat: usize) -> Result<()> {
    let source = Arc::new(HttpListingSource::new(&config.api)?);
    let gallery = ImageGallery::new(source, ResourceCache::new(), config.cache.image_ttl());

    // Concurrent requests for the same listing share one fetch
    let requests = ids
        .iter()
        .flat_map(|id| std::iter::repeat(id).take(repeat.max(1)))
        .map(|id| {
            let gallery = gallery.clone();
            async move { (id, gallery.images_for(id).await) }
        });

    let mut printed = std::collections::HashSet::new();
    for (id, result) in join_all(requests).await {
        if !printed.insert(id) {
            continue;
        }
        match result {
            Ok(images) => {
                println!("{} ({} images)", id, images.len());
                for url in images.iter() {
                    println!("  {}", url);
                }
            }
            Err(e) => eprintln!("{}: {}", id, e),
        }
    }

    Ok(())
}
