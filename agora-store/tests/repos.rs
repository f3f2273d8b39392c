//! Repository integration tests
//!
//! These need a PostgreSQL database and are ignored by default.
//! Run with: DATABASE_URL=postgres://... cargo test -p agora-store -- --ignored
//!
//! Each test works on its own freshly named users and communities, so the
//! suite can share one database and run in parallel.

use std::sync::Arc;

use agora_store::{
    CreateCommunityParams, CreateThreadParams, ErrorKind, FetchCommunitiesParams,
    FetchUsersParams, Pagination, RecordingRevalidator, SortOrder, Store, StoreConfig,
    UpdateUserParams, DEFAULT_PER_PAGE,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const EDIT_PATH: &str = "/profile/edit";

fn token() -> String {
    Uuid::new_v4().simple().to_string()
}

async fn setup() -> (Store, Arc<RecordingRevalidator>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let recorder = Arc::new(RecordingRevalidator::new());
    let store = Store::connect(StoreConfig::with_database_url(url), recorder.clone())
        .await
        .expect("connect failed");
    store.migrate().await.expect("migrations failed");
    (store, recorder)
}

async fn create_user(store: &Store, name: &str) -> String {
    let id = format!("user_{}", token());
    store
        .users()
        .update_user(UpdateUserParams {
            user_id: id.clone(),
            username: format!("u{}", token()),
            name: name.to_string(),
            bio: String::new(),
            image: "https://img.example/a.png".to_string(),
            path: "/onboarding".to_string(),
        })
        .await
        .expect("create user failed");
    id
}

async fn post(store: &Store, author_id: &str, text: &str) -> Uuid {
    store
        .threads()
        .create_thread(CreateThreadParams {
            text: text.to_string(),
            author_id: author_id.to_string(),
            community_id: None,
            path: "/".to_string(),
        })
        .await
        .expect("create thread failed")
        .id
}

async fn reply(store: &Store, parent: Uuid, author_id: &str, text: &str) -> Uuid {
    store
        .threads()
        .add_comment_to_thread(parent, text, author_id, &format!("/thread/{parent}"))
        .await
        .expect("reply failed")
        .id
}

async fn create_community(store: &Store, creator: &str) -> String {
    let id = format!("org_{}", token());
    store
        .communities()
        .create_community(CreateCommunityParams {
            id: id.clone(),
            name: "Rustaceans".to_string(),
            username: format!("c{}", token()),
            image: String::new(),
            bio: "crabs".to_string(),
            created_by_id: creator.to_string(),
        })
        .await
        .expect("create community failed");
    id
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_user_upserts_lowercases_and_onboards() {
    let (store, recorder) = setup().await;
    let id = format!("user_{}", token());
    let handle = format!("Mixed{}", token());

    let user = store
        .users()
        .update_user(UpdateUserParams {
            user_id: id.clone(),
            username: handle.clone(),
            name: "First".to_string(),
            bio: "hello".to_string(),
            image: String::new(),
            path: EDIT_PATH.to_string(),
        })
        .await
        .expect("insert failed");

    assert_eq!(user.username, handle.to_lowercase());
    assert!(user.onboarded);
    assert!(user.thread_ids.is_empty());
    assert_eq!(recorder.drain(), vec![EDIT_PATH]);

    let user = store
        .users()
        .update_user(UpdateUserParams {
            user_id: id.clone(),
            username: handle.clone(),
            name: "Second".to_string(),
            bio: String::new(),
            image: String::new(),
            path: "/onboarding".to_string(),
        })
        .await
        .expect("update failed");

    assert_eq!(user.id, id);
    assert_eq!(user.name, "Second");
    assert!(recorder.paths().is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn taken_username_is_already_exists() {
    let (store, _) = setup().await;
    let handle = format!("u{}", token());

    let params = |id: String| UpdateUserParams {
        user_id: id,
        username: handle.clone(),
        name: "Someone".to_string(),
        bio: String::new(),
        image: String::new(),
        path: String::new(),
    };

    store
        .users()
        .update_user(params(format!("user_{}", token())))
        .await
        .expect("first user failed");
    let err = store
        .users()
        .update_user(params(format!("user_{}", token())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
#[ignore = "requires database"]
async fn fetch_users_excludes_self_and_pages() {
    let (store, _) = setup().await;
    let tag = token();
    let me = create_user(&store, &format!("Me {tag}")).await;
    for n in 0..3 {
        create_user(&store, &format!("Peer {n} {tag}")).await;
    }

    let mut params = FetchUsersParams::new(me.clone());
    params.search_string = tag.to_uppercase();
    params.page_size = 2;

    let first = store.users().fetch_users(params.clone()).await.expect("page 1");
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);
    assert!(first.is_next);
    assert!(first.items.iter().all(|u| u.id != me));
    assert!(first.items.iter().all(|u| u.name.contains(&tag)));

    params.page_number = 2;
    let second = store.users().fetch_users(params).await.expect("page 2");
    assert_eq!(second.items.len(), 1);
    assert!(!second.is_next);
}

#[test]
fn fetch_users_defaults() {
    let params = FetchUsersParams::new("user_x");
    assert_eq!(params.page_number, 1);
    assert_eq!(params.page_size, DEFAULT_PER_PAGE);
    assert!(params.search_string.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_thread_drops_community_and_lists_under_author() {
    let (store, recorder) = setup().await;
    let author = create_user(&store, "Author").await;
    let community = create_community(&store, &author).await;

    let thread = store
        .threads()
        .create_thread(CreateThreadParams {
            text: "first post".to_string(),
            author_id: author.clone(),
            community_id: Some(community.clone()),
            path: "/create-thread".to_string(),
        })
        .await
        .expect("create thread failed");

    assert_eq!(thread.community_id, None);
    assert_eq!(thread.parent_id, None);
    assert_eq!(recorder.drain(), vec!["/create-thread"]);

    let user = store.users().fetch_user(&author).await.unwrap().unwrap();
    assert_eq!(user.thread_ids, vec![thread.id]);

    let posts = store
        .communities()
        .fetch_community_posts(&community)
        .await
        .unwrap()
        .unwrap();
    assert!(posts.threads.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_thread_for_unknown_author_is_not_found() {
    let (store, _) = setup().await;

    let err = store
        .threads()
        .create_thread(CreateThreadParams {
            text: "orphan".to_string(),
            author_id: format!("user_{}", token()),
            community_id: None,
            path: "/".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires database"]
async fn comment_on_missing_thread_writes_nothing() {
    let (store, recorder) = setup().await;
    let author = create_user(&store, "Commenter").await;
    let missing = Uuid::new_v4();

    let err = store
        .threads()
        .add_comment_to_thread(missing, "hello?", &author, "/thread/x")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(store.threads().count_replies(missing).await.unwrap(), 0);
    assert!(recorder.paths().is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn comment_adds_exactly_one_child() {
    let (store, recorder) = setup().await;
    let author = create_user(&store, "Poster").await;
    let other = create_user(&store, "Replier").await;
    let root = post(&store, &author, "root").await;
    recorder.drain();

    let before = store.threads().count_replies(root).await.unwrap();
    let id = reply(&store, root, &other, "first!").await;
    let after = store.threads().count_replies(root).await.unwrap();

    assert_eq!(after, before + 1);
    assert_eq!(recorder.drain(), vec![format!("/thread/{root}")]);

    let detail = store.threads().fetch_thread_by_id(root).await.unwrap().unwrap();
    assert_eq!(detail.children.len(), 1);
    assert_eq!(detail.children[0].thread.id, id);
    assert_eq!(detail.children[0].thread.parent_id, Some(root));
    assert_eq!(detail.children[0].author.id, other);

    // Replies never show up as the author's top-level threads.
    let user = store.users().fetch_user(&other).await.unwrap().unwrap();
    assert!(user.thread_ids.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn thread_detail_stops_after_two_levels() {
    let (store, _) = setup().await;
    let author = create_user(&store, "Deep").await;
    let root = post(&store, &author, "level 0").await;
    let one = reply(&store, root, &author, "level 1").await;
    let two = reply(&store, one, &author, "level 2").await;
    reply(&store, two, &author, "level 3").await;

    let detail = store.threads().fetch_thread_by_id(root).await.unwrap().unwrap();
    assert_eq!(detail.author.id, author);

    let level1 = &detail.children[0];
    assert_eq!(level1.thread.id, one);
    let level2 = &level1.children[0];
    assert_eq!(level2.thread.id, two);
    assert!(level2.children.is_empty());
    assert_eq!(level2.reply_count, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn feed_is_newest_first_with_one_reply_level() {
    let (store, _) = setup().await;
    let author = create_user(&store, "Feeder").await;
    let older = post(&store, &author, "older").await;
    let child = reply(&store, older, &author, "child").await;
    reply(&store, child, &author, "grandchild").await;
    let newer = post(&store, &author, "newer").await;

    let profile = store
        .users()
        .fetch_threads_by_profile(&author)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<Uuid> = profile.threads.iter().map(|t| t.thread.id).collect();
    assert_eq!(ids, vec![older, newer]);
    assert_eq!(profile.threads[0].children.len(), 1);
    assert!(profile.threads[0].children[0].children.is_empty());

    let feed = store
        .threads()
        .fetch_threads(Pagination::new(1, 100))
        .await
        .unwrap();
    let pos = |id: Uuid| feed.items.iter().position(|t| t.thread.id == id);
    if let (Some(n), Some(o)) = (pos(newer), pos(older)) {
        assert!(n < o);
    }
    assert!(feed.items.iter().all(|t| t.thread.parent_id.is_none()));
}

#[tokio::test]
#[ignore = "requires database"]
async fn new_community_shows_creator_and_no_members() {
    let (store, _) = setup().await;
    let creator = create_user(&store, "Founder").await;
    let community = create_community(&store, &creator).await;

    let details = store
        .communities()
        .fetch_community_details(&community)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.creator.id, creator);
    assert!(details.members.is_empty());

    let user = store.users().fetch_user(&creator).await.unwrap().unwrap();
    assert_eq!(user.community_ids, vec![community]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn community_for_unknown_creator_is_not_found() {
    let (store, _) = setup().await;

    let err = store
        .communities()
        .create_community(CreateCommunityParams {
            id: format!("org_{}", token()),
            name: "Ghost town".to_string(),
            username: format!("c{}", token()),
            image: String::new(),
            bio: String::new(),
            created_by_id: format!("user_{}", token()),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires database"]
async fn membership_is_unique_and_reversible() {
    let (store, _) = setup().await;
    let creator = create_user(&store, "Owner").await;
    let member = create_user(&store, "Joiner").await;
    let community = create_community(&store, &creator).await;

    store
        .communities()
        .add_member_to_community(&community, &member)
        .await
        .expect("join failed");
    let err = store
        .communities()
        .add_member_to_community(&community, &member)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let details = store
        .communities()
        .fetch_community_details(&community)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.members.len(), 1);
    assert_eq!(details.members[0].id, member);

    let user = store.users().fetch_user(&member).await.unwrap().unwrap();
    assert_eq!(user.community_ids, vec![community.clone()]);

    let removed = store
        .communities()
        .remove_user_from_community(&member, &community)
        .await
        .unwrap();
    assert!(removed);

    let user = store.users().fetch_user(&member).await.unwrap().unwrap();
    assert!(user.community_ids.is_empty());

    let err = store
        .communities()
        .add_member_to_community(&format!("org_{}", token()), &member)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires database"]
async fn community_update_and_search() {
    let (store, _) = setup().await;
    let creator = create_user(&store, "Editor").await;
    let community = create_community(&store, &creator).await;
    let tag = token();

    let updated = store
        .communities()
        .update_community_info(&community, &format!("Renamed {tag}"), &format!("c{tag}"), "")
        .await
        .unwrap();
    assert_eq!(updated.name, format!("Renamed {tag}"));

    let page = store
        .communities()
        .fetch_communities(FetchCommunitiesParams {
            search_string: tag.clone(),
            ..FetchCommunitiesParams::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].community.id, community);
    assert!(!page.is_next);

    let err = store
        .communities()
        .update_community_info(&format!("org_{}", token()), "x", "y", "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_community_cascades() {
    let (store, _) = setup().await;
    let creator = create_user(&store, "Leaver").await;
    let member = create_user(&store, "Bystander").await;
    let community = create_community(&store, &creator).await;
    store
        .communities()
        .add_member_to_community(&community, &member)
        .await
        .unwrap();

    let deleted = store.communities().delete_community(&community).await.unwrap();
    assert_eq!(deleted.id, community);

    assert!(store
        .communities()
        .fetch_community_details(&community)
        .await
        .unwrap()
        .is_none());
    let user = store.users().fetch_user(&member).await.unwrap().unwrap();
    assert!(user.community_ids.is_empty());

    let err = store
        .communities()
        .delete_community(&community)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires database"]
async fn activity_lists_replies_from_others() {
    let (store, _) = setup().await;
    let author = create_user(&store, "Host").await;
    let guest = create_user(&store, "Guest").await;
    let root = post(&store, &author, "talk to me").await;
    reply(&store, root, &author, "self reply").await;
    let theirs = reply(&store, root, &guest, "hi").await;

    let activity = store.users().get_activity(&author).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].reply.id, theirs);
    assert_eq!(activity[0].author.id, guest);
}

async fn users_in_order(store: &Store, tag: &str, sort_by: SortOrder) -> Vec<String> {
    let mut params = FetchUsersParams::new(format!("user_{}", token()));
    params.search_string = tag.to_string();
    params.sort_by = sort_by;
    let page = store.users().fetch_users(params).await.expect("fetch users failed");
    page.items.into_iter().map(|u| u.id).collect()
}

#[tokio::test]
#[ignore = "requires database"]
async fn fetch_users_follows_sort_order() {
    let (store, _) = setup().await;
    let tag = token();
    let mut created = Vec::new();
    for n in 0..3 {
        created.push(create_user(&store, &format!("Sorted {n} {tag}")).await);
    }

    assert_eq!(users_in_order(&store, &tag, SortOrder::Asc).await, created);
    created.reverse();
    assert_eq!(users_in_order(&store, &tag, SortOrder::Desc).await, created);
}

#[tokio::test]
#[ignore = "requires database"]
async fn user_search_treats_wildcards_literally() {
    let (store, _) = setup().await;
    let tag = token();
    let deal = create_user(&store, &format!("{tag} 50%_off")).await;
    create_user(&store, &format!("{tag} 5000")).await;

    let mut params = FetchUsersParams::new(format!("user_{}", token()));
    params.search_string = format!("{tag} 5_%");
    let page = store.users().fetch_users(params.clone()).await.unwrap();
    assert_eq!(page.total, 0);

    params.search_string = format!("{tag} 50%_");
    let page = store.users().fetch_users(params).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, deal);
}

#[tokio::test]
#[ignore = "requires database"]
async fn fetch_communities_follows_sort_order() {
    let (store, _) = setup().await;
    let creator = create_user(&store, "Curator").await;
    let tag = token();
    let mut created = Vec::new();
    for n in 0..3 {
        let id = format!("org_{}", token());
        store
            .communities()
            .create_community(CreateCommunityParams {
                id: id.clone(),
                name: format!("Club {n} {tag}"),
                username: format!("c{}", token()),
                image: String::new(),
                bio: String::new(),
                created_by_id: creator.clone(),
            })
            .await
            .expect("create community failed");
        created.push(id);
    }

    let listed = |sort_by: SortOrder| {
        let store = store.clone();
        let tag = tag.clone();
        async move {
            store
                .communities()
                .fetch_communities(FetchCommunitiesParams {
                    search_string: tag,
                    sort_by,
                    ..FetchCommunitiesParams::default()
                })
                .await
                .expect("fetch communities failed")
                .items
                .into_iter()
                .map(|c| c.community.id)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(listed(SortOrder::Asc).await, created);
    created.reverse();
    assert_eq!(listed(SortOrder::Desc).await, created);
}
