pub mod event;
pub mod items;

pub use event::{EventDocument, Field, GuestRange};
pub use items::{
    generate_item_id, Expense, ExpensePatch, ExpenseStatus, Guest, GuestPatch, GuestStatus,
    NewExpense, NewGuest, NewSegment, Segment,
};
