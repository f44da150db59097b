use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trainhub_core::model::{AnswerEntry, Question, QuestionOption, QuestionType};
use trainhub_core::progress::{MediaSampler, ProgressPolicy};
use trainhub_core::scoring::score;

fn make_questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| {
            if i % 3 == 2 {
                Question {
                    id: format!("q{i}"),
                    text: format!("statement {i}"),
                    question_type: QuestionType::TrueFalse,
                    options: vec![],
                    correct_answer: Some("true".into()),
                    points: 1,
                    explanation: None,
                }
            } else {
                Question {
                    id: format!("q{i}"),
                    text: format!("question {i}"),
                    question_type: QuestionType::MultipleChoice,
                    options: (0..4)
                        .map(|o| QuestionOption {
                            id: format!("q{i}-o{o}"),
                            text: format!("option {o}"),
                            is_correct: o == 0,
                        })
                        .collect(),
                    correct_answer: None,
                    points: 2,
                    explanation: None,
                }
            }
        })
        .collect()
}

fn make_answers(questions: &[Question]) -> Vec<AnswerEntry> {
    questions
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 5 != 4)
        .map(|(_, q)| match q.question_type {
            QuestionType::MultipleChoice => AnswerEntry {
                question_id: q.id.clone(),
                selected_option_id: Some(format!("{}-o0", q.id)),
                answer_text: None,
            },
            _ => AnswerEntry {
                question_id: q.id.clone(),
                selected_option_id: None,
                answer_text: Some("true".into()),
            },
        })
        .collect()
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [10usize, 100, 1000] {
        let questions = make_questions(n);
        let answers = make_answers(&questions);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| score(black_box(&questions), black_box(&answers), black_box(80)))
        });
    }

    group.finish();
}

fn bench_media_sampler(c: &mut Criterion) {
    let policy = ProgressPolicy::default();

    c.bench_function("sampler_one_hour_at_4hz", |b| {
        b.iter(|| {
            let mut sampler = MediaSampler::new(&policy);
            let mut sent = 0u32;
            for tick in 0..14_400u32 {
                let t = f64::from(tick) * 0.25;
                if sampler.time_update(black_box(t), 3600.0).is_some() {
                    sent += 1;
                }
            }
            sent
        })
    });
}

criterion_group!(benches, bench_score, bench_media_sampler);
criterion_main!(benches);
