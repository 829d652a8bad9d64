use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivicError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No place found for ZIP code {0}")]
    ZipNotFound(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
