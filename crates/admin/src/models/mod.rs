//! Row types and edit forms for the admin panel.

pub mod content;
pub mod order;
pub mod product;
pub mod session;

pub use content::{
    Banner, BannerForm, BannerInput, Block, BlockFields, BlockTranslation, FooterForm,
    LocaleQuery, NewBlockForm, Section, SectionForm, SectionTranslation,
};
pub use order::{Order, OrderItem, OrderListRow};
pub use product::{
    FamilyForm, FamilyInput, FormError, Product, ProductFamily, ProductForm, ProductInput,
    ProductListRow,
};
pub use session::{CurrentAdmin, keys};
