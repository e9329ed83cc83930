//! Port option types translated into driver options.

use bson::{Document, doc};
use docsink_ports::{
    CollectionOptions, IndexDefinition, IndexDirection, TimeSeriesGranularity,
};
use mongodb::IndexModel;
use mongodb::options::{
    CreateCollectionOptions, IndexOptions, TimeseriesGranularity, TimeseriesOptions,
};

/// Driver options for creating the target collection.
pub fn create_collection_options(options: &CollectionOptions) -> CreateCollectionOptions {
    let mut driver = CreateCollectionOptions::default();
    if let Some(capped) = options.capped {
        driver.capped = Some(true);
        driver.size = Some(capped.max_size_bytes);
        driver.max = capped.max_documents;
    }
    if let Some(time_series) = options.time_series.as_ref() {
        driver.timeseries = Some(
            TimeseriesOptions::builder()
                .time_field(time_series.time_field.to_string())
                .meta_field(time_series.meta_field.as_deref().map(str::to_owned))
                .granularity(time_series.granularity.map(granularity))
                .build(),
        );
    }
    driver
}

/// Driver index model for a single-field index.
pub fn index_model(index: &IndexDefinition) -> IndexModel {
    let keys = index_keys(index);
    match index.expire_after {
        Some(expire_after) => IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().expire_after(expire_after).build())
            .build(),
        None => IndexModel::builder().keys(keys).build(),
    }
}

fn index_keys(index: &IndexDefinition) -> Document {
    let field = index.field.as_ref();
    match index.direction {
        IndexDirection::Ascending => doc! { field: 1_i32 },
        IndexDirection::Descending => doc! { field: -1_i32 },
        IndexDirection::Text => doc! { field: "text" },
    }
}

const fn granularity(value: TimeSeriesGranularity) -> TimeseriesGranularity {
    match value {
        TimeSeriesGranularity::Seconds => TimeseriesGranularity::Seconds,
        TimeSeriesGranularity::Minutes => TimeseriesGranularity::Minutes,
        TimeSeriesGranularity::Hours => TimeseriesGranularity::Hours,
    }
}
