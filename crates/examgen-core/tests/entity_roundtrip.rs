//! Serde roundtrip and JsonSchema validation tests for the entity types.

use chrono::{TimeZone, Utc};
use examgen_core::entities::*;
use examgen_core::enums::GradeLevel;
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn sample_question() -> Question {
    let mut q = Question::new("What is 7 x 8?", 3);
    q.id = 11;
    q.add_option(AnswerOption::new('a', "54", false));
    q.add_option(AnswerOption::new('b', "56", true));
    q.add_option(AnswerOption::new('c', "58", false));
    q
}

roundtrip_and_validate!(
    answer_option_roundtrip,
    AnswerOption,
    AnswerOption {
        id: 4,
        letter: 'd',
        answer: "forty-two".into(),
        correct: true,
        question_id: 9,
    }
);

roundtrip_and_validate!(question_roundtrip, Question, sample_question());

roundtrip_and_validate!(topic_roundtrip, Topic, {
    let mut topic = Topic::new("Multiplication tables", GradeLevel::Third, 1);
    topic.id = 3;
    topic.add_question(sample_question());
    topic
});

roundtrip_and_validate!(subject_roundtrip, Subject, {
    let mut subject = Subject::new("Mathematics");
    subject.id = 1;
    subject.add_topic(Topic::new("Fractions", GradeLevel::Fourth, 1));
    subject
});

roundtrip_and_validate!(test_roundtrip, Test, {
    let mut test = Test::new(
        "Third grade review",
        1,
        Some(3),
        1,
        false,
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
    );
    test.id = 2;
    test.questions.push(sample_question());
    test
});

roundtrip_and_validate!(
    correct_answer_roundtrip,
    CorrectAnswer,
    sample_question().correct_option().unwrap()
);
