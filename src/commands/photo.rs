use anyhow::{Result, bail};
use clap::Args;

use super::App;
use crate::photos::PhotoFinder;

/// `birdspot photo`
#[derive(Debug, Clone, Args)]
pub struct PhotoArgs {
    /// Species common name
    pub species: String,

    /// Only ask this source (flickr, wikimedia, pexels)
    #[arg(long)]
    pub source: Option<String>,

    /// How many distinct photos to list (1-5)
    #[arg(short, long, default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=5))]
    pub count: u8,

    /// Open the first photo in the browser
    #[arg(long)]
    pub open: bool,
}

pub async fn run(app: App, args: &PhotoArgs) -> Result<()> {
    let species = args.species.trim();
    if species.is_empty() {
        bail!("species name is empty");
    }
    let finder: PhotoFinder = match &args.source {
        Some(source) => app.photos.only(source)?,
        None => app.photos,
    };

    let photos = finder.photos_for(species, usize::from(args.count)).await;
    for photo in &photos {
        println!("{}", photo.url);
        println!("  by {}", photo.attribution);
    }
    if args.open {
        if let Some(photo) = photos.first() {
            let _ = open::that(&photo.url);
        }
    }
    Ok(())
}
