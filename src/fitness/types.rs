//! Wire shapes of the dataset-aggregate endpoint.

use serde::{Deserialize, Serialize};

pub const STEP_COUNT_DELTA: &str = "com.google.step_count.delta";
pub const BUCKET_DURATION_MILLIS: i64 = 60_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub aggregate_by: Vec<AggregateBy>,
    pub bucket_by_time: BucketByTime,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
}

impl AggregateRequest {
    pub fn step_count(start_time_millis: i64, end_time_millis: i64) -> Self {
        Self {
            aggregate_by: vec![AggregateBy {
                data_type_name: STEP_COUNT_DELTA.to_string(),
            }],
            bucket_by_time: BucketByTime {
                duration_millis: BUCKET_DURATION_MILLIS,
            },
            start_time_millis,
            end_time_millis,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBy {
    pub data_type_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketByTime {
    pub duration_millis: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateResponse {
    #[serde(default)]
    pub bucket: Vec<Bucket>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub dataset: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub point: Vec<DataPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPoint {
    #[serde(default)]
    pub value: Vec<TypedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    pub int_val: Option<i64>,
}

impl AggregateResponse {
    /// Last bucket, last dataset, first point, first value. Later buckets are
    /// more recent and a bucket's last dataset is its most complete pass.
    pub fn latest_step_count(&self) -> Option<i64> {
        self.bucket
            .last()?
            .dataset
            .last()?
            .point
            .first()?
            .value
            .first()?
            .int_val
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AggregateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn takes_the_first_point_of_the_last_dataset() {
        let response = parse(json!({
            "bucket": [{
                "dataset": [
                    { "point": [] },
                    { "point": [{ "value": [{ "intVal": 4200 }] }] }
                ]
            }]
        }));
        assert_eq!(response.latest_step_count(), Some(4200));
    }

    #[test]
    fn later_buckets_win() {
        let response = parse(json!({
            "bucket": [
                { "dataset": [{ "point": [{ "value": [{ "intVal": 10 }] }] }] },
                { "dataset": [{ "point": [
                    { "value": [{ "intVal": 25 }] },
                    { "value": [{ "intVal": 99 }] }
                ] }] }
            ]
        }));
        assert_eq!(response.latest_step_count(), Some(25));
    }

    #[test]
    fn any_empty_level_means_no_sample() {
        for body in [
            json!({ "bucket": [] }),
            json!({}),
            json!({ "bucket": [{ "dataset": [] }] }),
            json!({ "bucket": [{ "dataset": [{ "point": [] }] }] }),
            json!({ "bucket": [{ "dataset": [{ "point": [{ "value": [] }] }] }] }),
            json!({ "bucket": [{ "dataset": [{ "point": [{ "value": [{ "fpVal": 1.5 }] }] }] }] }),
        ] {
            assert_eq!(parse(body).latest_step_count(), None);
        }
    }

    #[test]
    fn request_body_uses_one_minute_step_buckets() {
        let body = serde_json::to_value(AggregateRequest::step_count(1_000, 61_000)).unwrap();
        assert_eq!(
            body,
            json!({
                "aggregateBy": [{ "dataTypeName": "com.google.step_count.delta" }],
                "bucketByTime": { "durationMillis": 60000 },
                "startTimeMillis": 1000,
                "endTimeMillis": 61000
            })
        );
    }
}
