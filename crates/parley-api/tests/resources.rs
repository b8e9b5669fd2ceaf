mod common;

use serde_json::json;

use common::{TestApp, request};
use parley_api::credentials::Credentials;
use parley_api::resources;
use parley_types::envelope::ApiRequest;

fn create_server(app: &TestApp, token: &str, name: &str) -> i64 {
    let (status, body) = app.api(
        request("POST", "servers", token).with_body(json!({ "name": name }).to_string()),
    );
    assert_eq!(status, 201, "create server failed: {}", body);
    body["server"]["id"].as_i64().unwrap()
}

fn first_channel(app: &TestApp, token: &str, server_id: i64) -> String {
    let (status, body) = app.api(
        request("GET", "channels", token).with_query("server_id", server_id.to_string()),
    );
    assert_eq!(status, 200);
    body["channels"][0]["id"].as_str().unwrap().to_string()
}

#[test]
fn preflight_needs_no_token() {
    let app = TestApp::new();
    let resp = resources::handle(
        &app.state,
        &ApiRequest::new("OPTIONS").with_query("path", "servers"),
    );

    assert_eq!(resp.status_code, 200);
    assert!(resp.body.is_empty());
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(
        resp.header("Access-Control-Allow-Methods"),
        Some("GET, POST, PUT, DELETE, OPTIONS")
    );
    assert_eq!(
        resp.header("Access-Control-Allow-Headers"),
        Some("Content-Type, X-Auth-Token")
    );
    assert_eq!(resp.header("Access-Control-Max-Age"), Some("86400"));
}

#[test]
fn bad_tokens_are_rejected_before_any_write() {
    let app = TestApp::new();
    app.register("alice@example.com", "alice", "hunter22");
    let foreign = Credentials::new("some-other-secret")
        .issue_token(1, "alice@example.com")
        .unwrap();

    let body = json!({ "name": "Guild" }).to_string();
    let requests = [
        ApiRequest::new("POST")
            .with_query("path", "servers")
            .with_body(body.clone()),
        request("POST", "servers", "garbled.token.value").with_body(body.clone()),
        request("POST", "servers", &foreign).with_body(body.clone()),
        request("GET", "nowhere", "garbled"),
    ];

    for req in requests {
        let (status, body) = app.api(req);
        assert_eq!(status, 401);
        assert_eq!(body["error"], "Unauthorized");
    }

    assert_eq!(app.count("servers"), 0);
    assert_eq!(app.count("server_members"), 0);
    assert_eq!(app.count("channels"), 0);
}

#[test]
fn unknown_resource_is_not_found() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");

    for req in [
        request("GET", "voice", &alice.token),
        request("DELETE", "servers", &alice.token),
        request("POST", "channels", &alice.token),
        ApiRequest::new("GET").with_header("x-auth-token", alice.token.as_str()),
    ] {
        let (status, body) = app.api(req);
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Not found");
    }
}

#[test]
fn creating_a_server_adds_owner_and_two_channels() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");

    let (status, body) = app.api(
        request("POST", "servers", &alice.token)
            .with_body(json!({ "name": "  Rustaceans  ", "user_id": 999 }).to_string()),
    );
    assert_eq!(status, 201);
    let server = &body["server"];
    assert_eq!(server["name"], "Rustaceans");
    assert_eq!(server["icon"], "🚀");
    assert_eq!(server["owner_id"], alice.id);
    assert!(server["created_at"].is_string());

    let server_id = server["id"].as_i64().unwrap();
    assert_eq!(
        app.scalar(&format!("SELECT COUNT(*) FROM channels WHERE server_id = {}", server_id)),
        2
    );
    assert_eq!(
        app.scalar(&format!(
            "SELECT COUNT(*) FROM server_members WHERE server_id = {} AND user_id = {}",
            server_id, alice.id
        )),
        1
    );
    assert_eq!(app.count("server_members"), 1);

    let (status, body) = app.api(
        request("GET", "channels", &alice.token).with_query("server_id", server_id.to_string()),
    );
    assert_eq!(status, 200);
    let channels = body["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0]["type"], "text");
    assert_eq!(channels[0]["position"], 0);
    assert_eq!(channels[1]["type"], "voice");
    assert_eq!(channels[1]["position"], 1);
}

#[test]
fn custom_icon_is_kept() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");

    let (status, body) = app.api(
        request("POST", "servers", &alice.token)
            .with_body(json!({ "name": "Crabs", "icon": "🦀" }).to_string()),
    );
    assert_eq!(status, 201);
    assert_eq!(body["server"]["icon"], "🦀");
}

#[test]
fn blank_server_name_is_rejected_without_writes() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");

    let (status, body) = app.api(
        request("POST", "servers", &alice.token).with_body(json!({ "name": "   " }).to_string()),
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Server name is required");
    assert_eq!(app.count("servers"), 0);
    assert_eq!(app.count("channels"), 0);
}

#[test]
fn failed_channel_insert_rolls_back_the_server() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");
    app.state
        .db
        .with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_voice BEFORE INSERT ON channels
                 WHEN NEW.type = 'voice'
                 BEGIN SELECT RAISE(ABORT, 'voice channels disabled'); END;",
            )?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.api(
        request("POST", "servers", &alice.token).with_body(json!({ "name": "Guild" }).to_string()),
    );
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal server error");

    assert_eq!(app.count("servers"), 0);
    assert_eq!(app.count("server_members"), 0);
    assert_eq!(app.count("channels"), 0);
}

#[test]
fn servers_are_listed_for_members_only() {
    let app = TestApp::new();
    let owner = app.register("owner@example.com", "owner", "hunter22");
    let alice = app.register("alice@example.com", "alice", "hunter22");

    let a = create_server(&app, &owner.token, "A");
    let _b = create_server(&app, &owner.token, "B");
    let c = create_server(&app, &owner.token, "C");
    app.state.db.add_member(a, alice.id).unwrap();
    app.state.db.add_member(c, alice.id).unwrap();

    let (status, body) = app.api(request("GET", "servers", &alice.token));
    assert_eq!(status, 200);
    let names: Vec<_> = body["servers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["A", "C"]);
}

#[test]
fn message_history_is_the_latest_fifty_in_order() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");
    let server = create_server(&app, &alice.token, "Guild");
    let channel = first_channel(&app, &alice.token, server);

    for i in 0..51 {
        let (status, _) = app.api(
            request("POST", "messages", &alice.token).with_body(
                json!({ "channel_id": channel, "content": format!("message {}", i) }).to_string(),
            ),
        );
        assert_eq!(status, 201);
    }

    let (status, body) = app.api(
        request("GET", "messages", &alice.token).with_query("channel_id", channel.as_str()),
    );
    assert_eq!(status, 200);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(messages[0]["content"], "message 1");
    assert_eq!(messages[49]["content"], "message 50");
    assert_eq!(messages[0]["author"], "alice");
    assert_eq!(messages[0]["author_id"], alice.id);
}

#[test]
fn posted_message_author_comes_from_the_token() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");
    let server = create_server(&app, &alice.token, "Guild");
    let channel = first_channel(&app, &alice.token, server);

    let (status, body) = app.api(request("POST", "messages", &alice.token).with_body(
        json!({
            "channel_id": channel,
            "content": "  hello there  ",
            "user_id": 999,
            "author": "mallory",
        })
        .to_string(),
    ));
    assert_eq!(status, 201);
    let message = &body["message"];
    assert_eq!(message["content"], "hello there");
    assert_eq!(message["author"], "alice");
    assert_eq!(message["author_id"], alice.id);
    assert!(message["avatar"].is_null());
    assert_eq!(message["timestamp"].as_str().unwrap().len(), 5);
    assert!(message["id"].is_string());
}

#[test]
fn outsiders_cannot_read_or_post() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");
    let mallory = app.register("mallory@example.com", "mallory", "hunter22");
    let server = create_server(&app, &alice.token, "Guild");
    let channel = first_channel(&app, &alice.token, server);

    let (status, body) = app.api(
        request("GET", "channels", &mallory.token).with_query("server_id", server.to_string()),
    );
    assert_eq!(status, 200);
    assert_eq!(body["channels"], json!([]));

    let (status, body) = app.api(
        request("GET", "members", &mallory.token).with_query("server_id", server.to_string()),
    );
    assert_eq!(status, 200);
    assert_eq!(body["members"], json!([]));

    let (status, body) = app.api(
        request("POST", "messages", &mallory.token)
            .with_body(json!({ "channel_id": channel, "content": "hi" }).to_string()),
    );
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Channel not found");
    assert_eq!(app.count("messages"), 0);
}

#[test]
fn members_are_sorted_and_reported_online() {
    let app = TestApp::new();
    let zed = app.register("zed@example.com", "zed", "hunter22");
    let amy = app.register("amy@example.com", "amy", "hunter22");
    let server = create_server(&app, &zed.token, "Guild");
    app.state.db.add_member(server, amy.id).unwrap();

    let (status, body) = app.api(
        request("GET", "members", &amy.token).with_query("server_id", server.to_string()),
    );
    assert_eq!(status, 200);
    assert_eq!(
        body["members"],
        json!([
            { "id": amy.id, "name": "amy", "avatar": null, "online": true },
            { "id": zed.id, "name": "zed", "avatar": null, "online": true },
        ])
    );
}

#[test]
fn missing_parameters_are_bad_requests() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");

    for (method, path, field) in [
        ("GET", "channels", "server_id"),
        ("GET", "members", "server_id"),
        ("GET", "messages", "channel_id"),
        ("POST", "messages", "channel_id"),
    ] {
        let (status, body) = app.api(request(method, path, &alice.token));
        assert_eq!(status, 400);
        assert_eq!(body["error"], format!("{} is required", field));
    }
}

#[test]
fn concurrent_posts_to_one_channel_all_succeed() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "alice", "hunter22");
    let server = create_server(&app, &alice.token, "Guild");
    let channel = first_channel(&app, &alice.token, server);

    let statuses: Vec<u16> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let (app, token, channel) = (&app, &alice.token, &channel);
                scope.spawn(move || {
                    (0..20)
                        .map(|i| {
                            let body = json!({
                                "channel_id": channel,
                                "content": format!("worker {} message {}", worker, i),
                            });
                            app.api(request("POST", "messages", token).with_body(body.to_string()))
                                .0
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert!(statuses.iter().all(|&status| status == 201), "{:?}", statuses);
    assert_eq!(app.count("messages"), 160);
}
