/// CSV export of buckets, monthly reports and service orders.
pub mod export;
