use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio::sync::mpsc;

use nestfeed_core::{
    feed::{FeedEvent, ListingType, LoadKind, SearchFilters, SortOrder},
    AppConfig, FeedController, HttpListingSource,
};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Free-text keyword
    keyword: Option<String>,
    #[arg(short = 't', long = "type", value_enum)]
    listing_type: Option<ListingType>,
    /// Property type, e.g. apartment or house
    #[arg(short = 'p', long)]
    property_type: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(short = 'b', long)]
    bedrooms: Option<u32>,
    #[arg(long)]
    bathrooms: Option<u32>,
    /// Minimum floor area in square metres
    #[arg(long)]
    min_area: Option<f64>,
    /// Required amenity (repeatable)
    #[arg(short = 'a', long = "amenity")]
    amenities: Vec<String>,
    #[arg(long, value_enum)]
    sort: Option<SortOrder>,
    #[arg(short = 'l', long)]
    location: Option<String>,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

impl SearchArgs {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            keyword: self.keyword.clone(),
            property_type: self.property_type.clone(),
            listing_type: self.listing_type,
            min_price: self.min_price,
            max_price: self.max_price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            min_area: self.min_area,
            amenities: self.amenities.iter().cloned().collect(),
            sort: self.sort,
            location: self.location.clone(),
        }
    }
}

pub async fn run(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let filters = args.filters();
    let source = Arc::new(HttpListingSource::new(&config.api)?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = FeedController::new(source, config.feed.clone()).with_event_sender(tx);

    println!("Searching {}...", config.api.base_url);
    controller.set_filters(filters).await?;
    drain_events(&mut rx);

    for _ in 1..args.pages.max(1) {
        if !controller.state().has_more {
            break;
        }
        controller.load_more().await?;
        drain_events(&mut rx);
    }

    let state = controller.state();
    if state.items.is_empty() {
        match state.last_error {
            Some(e) => println!("No results ({}).", e),
            None => println!("No listings match."),
        }
    } else {
        for (i, listing) in state.items.iter().enumerate() {
            println!(
                "{:>4}. {:<40} {:>16}  {}",
                i + 1,
                listing.title,
                listing.price_label(),
                listing.location.as_deref().unwrap_or("-")
            );
        }
        println!(
            "\nShowing {} of {} listings (page {}){}",
            state.items.len(),
            state.total,
            state.page,
            if state.has_more { ", more available" } else { "" }
        );
    }

    controller.shutdown();
    Ok(())
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<FeedEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            FeedEvent::PageLoaded { kind, page, added, total } => {
                let label = match kind {
                    LoadKind::Reset => "Loaded",
                    LoadKind::More => "Appended",
                };
                println!("{} page {}: {} new listings ({} total matches)", label, page, added, total);
            }
            FeedEvent::LoadFailed { message, transient, .. } => {
                if transient {
                    eprintln!("Load failed (temporary, try again): {}", message);
                } else {
                    eprintln!("Load failed: {}", message);
                }
            }
            FeedEvent::ScrollIntoView { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SearchArgs,
    }

    fn parse(argv: &[&str]) -> Result<SearchFilters, clap::Error> {
        let argv = std::iter::once("search").chain(argv.iter().copied());
        Harness::try_parse_from(argv).map(|h| h.args.filters())
    }

    #[test]
    fn test_enum_flags_parse() {
        let filters = parse(&["loft", "--type", "buy", "--sort", "price_desc", "-a", "pool"]).unwrap();
        assert_eq!(filters.keyword.as_deref(), Some("loft"));
        assert_eq!(filters.listing_type, Some(ListingType::Sale));
        assert_eq!(filters.sort, Some(SortOrder::PriceDesc));
        assert!(filters.amenities.contains("pool"));

        let filters = parse(&["-t", "rent"]).unwrap();
        assert_eq!(filters.listing_type, Some(ListingType::Rent));
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        assert!(parse(&["--sort", "cheapest"]).is_err());
        assert!(parse(&["--type", "lease"]).is_err());
    }
}
