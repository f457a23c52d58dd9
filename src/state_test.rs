use super::*;

#[test]
fn room_new_starts_with_template_and_no_members() {
    let room = Room::new("let x;", "let x = 1;");
    assert_eq!(room.buffer, "let x;");
    assert_eq!(room.solution(), "let x = 1;");
    assert!(room.mentor.is_none());
    assert!(room.students.is_empty());
    assert!(room.group.is_empty());
    assert!(room.is_empty());
}

#[test]
fn room_solution_is_stored_canonical() {
    let room = Room::new("", "function f() {\n  return 1;\n}\n");
    assert_eq!(room.solution(), "function f() { return 1; }");
}

#[test]
fn room_solved_tracks_buffer() {
    let mut room = Room::new("x", "  y\n");
    assert!(!room.solved());
    room.buffer = "y".into();
    assert!(room.solved());
    room.buffer = "y;".into();
    assert!(!room.solved());
}

#[test]
fn room_solved_when_template_already_matches() {
    let room = Room::new("done()\n", "done()");
    assert!(room.solved());
}

#[test]
fn role_lookup_distinguishes_mentor_and_students() {
    let mut room = Room::new("", "");
    let mentor = Uuid::new_v4();
    let student = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    room.mentor = Some(mentor);
    room.students.insert(student);

    assert_eq!(room.role_of(mentor), Some(Role::Mentor));
    assert_eq!(room.role_of(student), Some(Role::Student));
    assert_eq!(room.role_of(stranger), None);
    assert!(room.is_member(student));
    assert!(!room.is_member(stranger));
    assert!(!room.is_empty());
}

#[test]
fn role_wire_names() {
    assert_eq!(Role::Mentor.as_str(), "mentor");
    assert_eq!(Role::Student.as_str(), "student");
}

#[test]
fn registry_insert_if_absent_keeps_existing_room() {
    let mut rooms = RoomRegistry::new();
    assert!(rooms.insert_if_absent("ex1", Room::new("first", "s")));
    assert!(!rooms.insert_if_absent("ex1", Room::new("second", "s")));
    assert_eq!(rooms.get("ex1").map(|r| r.buffer.as_str()), Some("first"));
    assert_eq!(rooms.len(), 1);
}

#[test]
fn registry_delete_is_idempotent() {
    let mut rooms = RoomRegistry::new();
    rooms.insert_if_absent("ex1", Room::new("", ""));
    assert!(rooms.delete("ex1").is_some());
    assert!(rooms.delete("ex1").is_none());
    assert!(rooms.is_empty());
}

#[test]
fn registry_get_does_not_create() {
    let mut rooms = RoomRegistry::new();
    assert!(rooms.get("missing").is_none());
    assert!(rooms.get_mut("missing").is_none());
    assert!(!rooms.contains("missing"));
    assert!(rooms.is_empty());
}

#[test]
fn registry_deletion_generation_counts_without_live_room() {
    let mut rooms = RoomRegistry::new();
    assert_eq!(rooms.deletion_generation("ex9"), 0);
    rooms.mark_deleted("ex9");
    rooms.mark_deleted("ex9");
    assert_eq!(rooms.deletion_generation("ex9"), 2);
    assert_eq!(rooms.deletion_generation("ex1"), 0);
    assert!(rooms.is_empty());
}

#[test]
fn registry_rooms_with_member_finds_every_role() {
    let mut rooms = RoomRegistry::new();
    let conn = Uuid::new_v4();

    let mut a = Room::new("", "");
    a.mentor = Some(conn);
    let mut b = Room::new("", "");
    b.mentor = Some(Uuid::new_v4());
    b.students.insert(conn);
    let mut c = Room::new("", "");
    c.mentor = Some(Uuid::new_v4());

    rooms.insert_if_absent("a", a);
    rooms.insert_if_absent("b", b);
    rooms.insert_if_absent("c", c);

    let mut found = rooms.rooms_with_member(conn);
    found.sort();
    assert_eq!(found, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn app_state_starts_empty() {
    let state = test_helpers::test_app_state();
    assert!(state.rooms.read().await.is_empty());
    assert!(state.ws_clients.read().await.is_empty());
    assert_eq!(state.channel_capacity, DEFAULT_WS_CHANNEL_CAPACITY);
}
