//! Order aggregate and related types.

mod aggregate;
mod events;
mod item;
mod status;
mod value_objects;

pub use aggregate::{Order, OrderRecord};
pub use events::{
    ItemAddedData, ItemQuantityChangedData, ItemRemovedData, OrderClosedData, OrderCreatedData,
    OrderDeletedData, OrderEvent,
};
pub use item::OrderItem;
pub use status::OrderStatus;
pub use value_objects::{Money, OrderItemId, OrderNumber, ProductId};
