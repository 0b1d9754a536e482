// Source adapter implementations
pub mod mercadolivre;

pub use mercadolivre::MercadoLivreSource;
