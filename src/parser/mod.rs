pub mod assemble;
pub mod dates;
pub mod dom;
pub mod lexicon;
pub mod links;
pub mod locate;
pub mod pages;

pub use assemble::{Assembler, Gates, Offer, Rejection};
pub use dates::{parse_date_range, DateParseError, DateSpan, QualifierScope};
pub use links::{classify_link, LinkKind};
pub use pages::current::parse_current_calendar;
pub use pages::future::{parse_future_calendar, parse_future_calendar_on};
pub use pages::historical::{parse_historical_index, parse_year_page};
