mod feature;
pub use feature::Feature;

mod running_statistic;
pub use running_statistic::RunningStatistic;
