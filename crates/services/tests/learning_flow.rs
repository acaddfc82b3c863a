use chrono::Duration;
use record_core::model::{
    Actor, Answers, ContentId, ContentKind, ContentRef, CourseId, CourseMember, CourseRef,
    Percent, ProgressPatch, QuestionDraft, QuizDraft, Role, UserId,
};
use record_core::time::fixed_now;
use services::{AppServices, Clock, ErrorKind};

fn admin() -> Actor {
    Actor::new(UserId::new("author").expect("user id"), Role::Admin)
}

fn student() -> Actor {
    Actor::new(UserId::new("student").expect("user id"), Role::Student)
}

async fn seed_catalog(services: &AppServices) {
    let storage = services.storage();
    storage
        .directory
        .register_user(&admin().user_id, Role::Admin)
        .await
        .expect("register admin");
    storage
        .directory
        .register_user(&student().user_id, Role::Student)
        .await
        .expect("register student");
    storage
        .catalog
        .register_course(&CourseRef {
            id: CourseId::new(1),
            owner: admin().user_id,
        })
        .await
        .expect("register course");
    for id in [1_u64, 2] {
        storage
            .catalog
            .register_content(&ContentRef {
                id: ContentId::new(id),
                kind: ContentKind::CourseItem,
                owner: admin().user_id,
            })
            .await
            .expect("register content");
        storage
            .catalog
            .add_course_content(CourseMember {
                course_id: CourseId::new(1),
                content_id: ContentId::new(id),
                order: u32::try_from(id).expect("order"),
            })
            .await
            .expect("add member");
    }
}

fn question(text: &str, correct: u32) -> QuestionDraft {
    QuestionDraft {
        question: text.to_string(),
        options: vec!["a".into(), "b".into(), "c".into()],
        correct_answer: correct,
        points: None,
    }
}

#[tokio::test]
async fn learner_completes_course_and_quiz() {
    let clock = Clock::manual(fixed_now());
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_learning_flow?mode=memory&cache=shared",
        clock.clone(),
    )
    .await
    .expect("connect sqlite");
    seed_catalog(&services).await;

    let enrolled = services
        .enrollments()
        .enroll(&student(), CourseId::new(1))
        .await
        .expect("enroll");
    assert!(enrolled.created);
    let again = services
        .enrollments()
        .enroll(&student(), CourseId::new(1))
        .await
        .expect("enroll again");
    assert!(!again.created);

    clock.advance(Duration::minutes(10));
    services
        .progress()
        .record_progress(
            &student(),
            ContentId::new(1),
            ProgressPatch {
                progress: Some(Percent::FULL),
                time_spent: Some(25),
                completed: Some(true),
            },
        )
        .await
        .expect("progress on first item");
    let halfway = services
        .progress()
        .get_course_progress(&student(), CourseId::new(1))
        .await
        .expect("course progress");
    assert_eq!(halfway, Percent::FULL);

    services
        .progress()
        .record_progress(
            &student(),
            ContentId::new(2),
            ProgressPatch {
                progress: Some(Percent::new(50.0).expect("percent")),
                time_spent: Some(5),
                completed: None,
            },
        )
        .await
        .expect("progress on second item");
    let listed = services
        .enrollments()
        .list_enrollments(&student())
        .await
        .expect("list enrollments");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].enrollment.progress.value(), 75.0);
    assert_eq!(listed[0].course.id, CourseId::new(1));

    let quiz = services
        .quizzes()
        .create_quiz(
            &admin(),
            QuizDraft {
                title: "Course check".to_string(),
                course_id: Some(CourseId::new(1)),
                questions: vec![question("first", 0), question("second", 1)],
                ..QuizDraft::default()
            },
        )
        .await
        .expect("create quiz");
    let quiz_id = quiz.quiz.id;
    services
        .quizzes()
        .add_question(&admin(), quiz_id, question("third", 2), None)
        .await
        .expect("add question");
    services
        .quizzes()
        .publish_quiz(&admin(), quiz_id)
        .await
        .expect("publish");

    let attempt = services
        .quizzes()
        .start_attempt(&student(), quiz_id)
        .await
        .expect("start");
    clock.advance(Duration::minutes(3));
    let submitted = services
        .quizzes()
        .submit_attempt(&student(), attempt.id, Answers::from_choices([0, 1, 0]))
        .await
        .expect("submit");
    assert_eq!(submitted.score, Some(2));
    assert_eq!(submitted.max_score, Some(3));
    assert_eq!(submitted.passed, Some(false));
    assert_eq!(submitted.completed_at, Some(clock.now()));

    let resubmit = services
        .quizzes()
        .submit_attempt(&student(), attempt.id, Answers::from_choices([0, 1, 2]))
        .await
        .expect_err("second submit");
    assert_eq!(resubmit.kind(), ErrorKind::Conflict);

    let stats = services
        .stats()
        .user_stats(&student())
        .await
        .expect("user stats");
    assert_eq!(stats.total_enrollments, 1);
    assert_eq!(stats.completed_courses, 0);
    assert_eq!(stats.total_study_time, 30);
    assert!((stats.average_quiz_score - 66.67).abs() < 0.01);

    let admin_stats = services
        .stats()
        .admin_stats(&admin())
        .await
        .expect("admin stats");
    assert_eq!(admin_stats.total_students, 1);
    assert_eq!(admin_stats.total_content, 2);
    assert_eq!(admin_stats.total_courses, 1);
    assert_eq!(admin_stats.total_quizzes, 1);
}

#[tokio::test]
async fn finishing_every_item_completes_the_enrollment_once() {
    let clock = Clock::manual(fixed_now());
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_course_completion?mode=memory&cache=shared",
        clock.clone(),
    )
    .await
    .expect("connect sqlite");
    seed_catalog(&services).await;
    services
        .enrollments()
        .enroll(&student(), CourseId::new(1))
        .await
        .expect("enroll");

    for content in [1_u64, 2] {
        services
            .progress()
            .record_progress(
                &student(),
                ContentId::new(content),
                ProgressPatch::progress(Percent::FULL),
            )
            .await
            .expect("progress");
    }
    let finished_at = clock.now();

    clock.advance(Duration::days(1));
    services
        .progress()
        .record_progress(&student(), ContentId::new(1), ProgressPatch::time_spent(4))
        .await
        .expect("revisit");

    let listed = services
        .enrollments()
        .list_enrollments(&student())
        .await
        .expect("list enrollments");
    assert_eq!(listed[0].enrollment.progress, Percent::FULL);
    assert_eq!(listed[0].enrollment.completed_at, Some(finished_at));

    let stats = services
        .stats()
        .user_stats(&student())
        .await
        .expect("user stats");
    assert_eq!(stats.completed_courses, 1);
    assert_eq!(stats.average_quiz_score, 0.0);
}
