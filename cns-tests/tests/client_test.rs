// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use cns_client::{CnsList, CnsSession, SegLocation};
use cns_common::error::serrno::{ESEC_NO_CONTEXT, SEENTRYNFND};
use cns_common::proto::{
    CA_MAXCLASNAMELEN, CA_MAXPOOLNAMELEN, CA_MAXSFNLEN, CA_MAXTAPEPOOLS, CNS_LIST_BEGIN, CNS_LIST_CONTINUE, CNS_LIST_END,
};
use cns_common::state::{
    AclEntry, ClassMetadata, FileReplica, SegMetadata, SegmentChecksum, CNS_ACL_GROUP_OBJ, CNS_ACL_MASK, CNS_ACL_OTHER,
    CNS_ACL_USER, CNS_ACL_USER_OBJ,
};
use cns_common::utils::{FileMode, S_IFLNK, S_IFMT, S_IFREG};
use cns_common::NsResult;
use cns_tests::{NsTestServer, ADMIN, OTHER, USER};

const HOME: &str = "/home/u";

async fn setup_home(admin: &mut CnsSession) -> NsResult<()> {
    admin.mkdir("/home", 0o755).await?;
    admin.mkdir(HOME, 0o755).await?;
    admin.chown(HOME, USER.0, USER.1).await
}

#[test]
fn chmod_is_idempotent() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        let fileid = user.creat("/home/u/f1", 0o666).await?;

        let st = user.stat("/home/u/f1").await?;
        assert_eq!(st.fileid, fileid);
        assert_eq!(st.filemode & S_IFMT, S_IFREG);
        assert_eq!(st.filemode & 0o7777, 0o644);
        assert_eq!((st.uid, st.gid), USER);

        user.chmod("/home/u/f1", 0o600).await?;
        let first = user.stat("/home/u/f1").await?;
        user.chmod("/home/u/f1", 0o600).await?;
        let second = user.stat("/home/u/f1").await?;
        assert_eq!(first.filemode & 0o7777, 0o600);
        assert_eq!(first.filemode, second.filemode);

        let err = admin.stat("/home/u/missing").await.unwrap_err();
        assert_eq!(err.code(), libc::ENOENT);
        Ok(())
    })
}

#[test]
fn validation_fails_without_a_round_trip() {
    // Nothing listens on this configuration.
    let conf = cns_common::conf::ClientConf {
        host: "127.0.0.1".to_string(),
        port: 1,
        csec_disable: true,
        ..Default::default()
    };
    let mut session = CnsSession::with_identity(conf, USER.0, USER.1);
    let rt = orpc::runtime::Runtime::single().unwrap();
    rt.block_on(async {
        assert_eq!(session.chmod("", 0o644).await.unwrap_err().code(), libc::ENOENT);
        let long = format!("/{}", "a".repeat(1100));
        assert_eq!(session.chmod(&long, 0o644).await.unwrap_err().code(), libc::ENAMETOOLONG);
        assert_eq!(session.getidmap("", &["g"]).await.unwrap_err().code(), libc::EINVAL);
    });
}

#[test]
fn readlink_returns_the_exact_target() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        user.symlink("../x/./y", "/home/u/l1").await?;
        assert_eq!(user.readlink("/home/u/l1").await?, "../x/./y");

        let st = user.lstat("/home/u/l1").await?;
        assert_eq!(st.filemode & S_IFMT, S_IFLNK);
        assert_eq!(user.stat("/home/u/l1").await.unwrap_err().code(), libc::ENOENT);

        user.creat("/home/u/target", 0o644).await?;
        user.symlink("/home/u/target", "/home/u/l2").await?;
        let links = user.getlinks(Some("/home/u/target"), "").await?;
        assert_eq!(links, vec!["/home/u/target", "/home/u/l2"]);
        Ok(())
    })
}

#[test]
fn readdir_returns_every_entry() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        // Long names so the directory spans several reply buffers.
        let mut expected = vec![];
        for i in 0..150 {
            let name = format!("entry-{:04}-{}", i, "n".repeat(48));
            user.creat(&format!("{}/{}", HOME, name), 0o644).await?;
            expected.push(name);
        }
        expected.sort();

        let mut dir = user.opendir(HOME).await?;
        let mut names = vec![];
        while let Some(name) = user.readdir(&mut dir).await? {
            names.push(name);
        }
        assert_eq!(names, expected);

        // Another level starts over from the first entry.
        let mut count = 0;
        while let Some(x) = user.readdirx(&mut dir).await? {
            assert_eq!(x.stat.filemode & S_IFMT, S_IFREG);
            count += 1;
        }
        assert_eq!(count, expected.len());

        user.rewinddir(&mut dir);
        assert!(user.readdirx(&mut dir).await?.is_some());
        user.closedir(dir).await?;
        assert!(!user.is_connected());
        Ok(())
    })
}

#[test]
fn listclass_spans_several_replies() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);

    server.block_on(async {
        for i in 1..=120 {
            let class = ClassMetadata {
                classid: i,
                name: format!("class{}", i),
                max_filesize: 1000,
                nbcopies: 1,
                tppools: vec!["default".to_string()],
                ..Default::default()
            };
            admin.enterclass(None, &class).await?;
        }

        let mut list = CnsList::new();
        let mut ids = vec![];
        let mut flags = CNS_LIST_BEGIN;
        while let Some(class) = admin.listclass(None, flags, &mut list).await? {
            ids.push(class.classid);
            flags = CNS_LIST_CONTINUE;
        }
        admin.listclass(None, CNS_LIST_END, &mut list).await?;
        assert_eq!(ids, (1..=120).collect::<Vec<i32>>());
        assert!(!admin.is_connected());

        let mut update = ClassMetadata::unchanged();
        update.nbcopies = 2;
        admin.modifyclass(None, 7, "", &update).await?;
        let class = admin.queryclass(None, 0, "class7").await?;
        assert_eq!((class.classid, class.nbcopies, class.max_filesize), (7, 2, 1000));
        Ok(())
    })
}

#[test]
fn listings_survive_entries_near_the_buffer_size() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);

    server.block_on(async {
        let class = |classid: i32, name: String, tppools: Vec<String>| ClassMetadata {
            classid,
            name,
            nbcopies: 1,
            tppools,
            ..Default::default()
        };
        let pools = |n: usize| -> Vec<String> { (0..n).map(|i| format!("pool{:011}", i)).collect() };
        assert_eq!(pools(1)[0].len(), CA_MAXPOOLNAMELEN);

        admin.enterclass(None, &class(1, "small1".to_string(), pools(1))).await?;
        admin
            .enterclass(None, &class(2, "w".repeat(CA_MAXCLASNAMELEN), pools(CA_MAXTAPEPOOLS)))
            .await?;
        for i in 3..=40 {
            admin.enterclass(None, &class(i, format!("small{}", i), pools(1))).await?;
        }
        let err = admin
            .enterclass(None, &class(41, "toowide".to_string(), pools(CA_MAXTAPEPOOLS + 10)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), libc::EINVAL);

        let mut list = CnsList::new();
        let mut ids = vec![];
        let mut flags = CNS_LIST_BEGIN;
        while let Some(c) = admin.listclass(None, flags, &mut list).await? {
            if c.classid == 2 {
                assert_eq!(c.tppools.len(), CA_MAXTAPEPOOLS);
            }
            ids.push(c.classid);
            flags = CNS_LIST_CONTINUE;
        }
        admin.listclass(None, CNS_LIST_END, &mut list).await?;
        assert_eq!(ids, (1..=40).collect::<Vec<i32>>());

        admin.creat("/replicated", 0o644).await?;
        let fileid = admin.stat("/replicated").await?.fileid;
        let mut expected = vec![];
        for i in 0..40 {
            let sfn = if i == 20 {
                format!("/srv/{}", "s".repeat(CA_MAXSFNLEN - 5))
            } else {
                format!("/srv/data/{:04}/{}", i, "d".repeat(400))
            };
            let replica = FileReplica {
                status: b'-',
                f_type: b'P',
                poolname: "disk".to_string(),
                host: "diskserver01".to_string(),
                fs: "/srv".to_string(),
                sfn: sfn.clone(),
                ..Default::default()
            };
            admin.addreplica("", fileid, &replica).await?;
            expected.push(sfn);
        }
        expected.sort();

        let mut list = CnsList::new();
        let mut sfns = vec![];
        let mut flags = CNS_LIST_BEGIN;
        while let Some(r) = admin.listreplica(Some("/replicated"), "", flags, &mut list).await? {
            assert_eq!(r.fileid, fileid);
            sfns.push(r.sfn);
            flags = CNS_LIST_CONTINUE;
        }
        admin.listreplica(Some("/replicated"), "", CNS_LIST_END, &mut list).await?;
        sfns.sort();
        assert_eq!(sfns, expected);
        assert!(!admin.is_connected());
        Ok(())
    })
}

fn segment(vid: &str, fseq: i32) -> SegMetadata {
    SegMetadata {
        copyno: 1,
        fsec: 1,
        segsize: 4096,
        s_status: b'-',
        vid: vid.to_string(),
        side: 0,
        fseq,
        blockid: [0, 0, 0, 1],
        ..Default::default()
    }
}

#[test]
fn replaceseg_moves_the_segment() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);

    server.block_on(async {
        setup_home(&mut admin).await?;
        let fileid = admin.creat("/home/u/data", 0o644).await?;
        admin.setsegattrs(None, fileid, &[segment("V00001", 3)]).await?;

        let old = SegLocation::of(&segment("V00001", 3));
        let mut new = segment("V00002", 8);
        new.checksum = SegmentChecksum::new("adler32", 0x1234);

        // A stale view of the old segment changes nothing.
        let stale = SegLocation { fseq: 4, ..old.clone() };
        assert_eq!(admin.replaceseg(fileid, &stale, &new).await.unwrap_err().code(), SEENTRYNFND);
        assert_eq!(admin.getsegattrs(None, fileid).await?[0].vid, "V00001");

        admin.replaceseg(fileid, &old, &new).await?;
        let segs = admin.getsegattrs(Some("/home/u/data"), 0).await?;
        assert_eq!(segs.len(), 1);
        assert_eq!((segs[0].vid.as_str(), segs[0].fseq, segs[0].segsize), ("V00002", 8, 4096));
        assert_eq!(segs[0].checksum, SegmentChecksum::new("adler32", 0x1234));

        let mut list = CnsList::new();
        let first = admin.listtape(None, "V00002", CNS_LIST_BEGIN, &mut list).await?;
        assert_eq!(first.map(|xt| xt.name), Some("data".to_string()));
        assert!(admin.listtape(None, "V00002", CNS_LIST_CONTINUE, &mut list).await?.is_none());
        admin.listtape(None, "V00002", CNS_LIST_END, &mut list).await?;

        let mut user = server.session(USER);
        let err = user.replaceseg(fileid, &SegLocation::of(&new), &segment("V00003", 1)).await.unwrap_err();
        assert_eq!(err.code(), libc::EACCES);
        Ok(())
    })
}

#[test]
fn aborted_transaction_is_rolled_back() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;

        user.starttrans(None, Some("abort me")).await?;
        user.mkdir("/home/u/d1", 0o755).await?;
        user.creat("/home/u/d1/f", 0o644).await?;
        user.aborttrans().await?;
        assert_eq!(user.stat("/home/u/d1").await.unwrap_err().code(), libc::ENOENT);

        user.starttrans(None, None).await?;
        user.mkdir("/home/u/d2", 0o755).await?;
        user.endtrans().await?;
        assert!(FileMode::is_dir(user.stat("/home/u/d2").await?.filemode));

        // A failing change ends the transaction and undoes the earlier ones.
        user.starttrans(None, None).await?;
        user.mkdir("/home/u/d3", 0o755).await?;
        assert_eq!(user.mkdir("/home/u/d2", 0o755).await.unwrap_err().code(), libc::EEXIST);
        assert!(!user.is_connected());
        assert_eq!(user.stat("/home/u/d3").await.unwrap_err().code(), libc::ENOENT);
        Ok(())
    })
}

#[test]
fn comments_and_identity_maps() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        user.creat("/home/u/f", 0o644).await?;
        user.setcomment("/home/u/f", "first copy").await?;
        assert_eq!(user.getcomment("/home/u/f").await?, "first copy");

        let mut dir = user.opendir(HOME).await?;
        assert_eq!(
            user.readdirc(&mut dir).await?,
            Some(("f".to_string(), "first copy".to_string()))
        );
        user.closedir(dir).await?;

        user.delcomment("/home/u/f").await?;
        assert_eq!(user.getcomment("/home/u/f").await.unwrap_err().code(), libc::ENOENT);

        admin.enterusrmap(1000, "alice").await?;
        assert_eq!(admin.getusrbyuid(1000).await?, "alice");
        assert_eq!(admin.getusrbynam("alice").await?, 1000);
        assert_eq!(admin.getusrbyuid(4242).await.unwrap_err().code(), libc::ENOENT);
        Ok(())
    })
}

#[test]
fn chdir_resolves_relative_paths() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        user.chdir(HOME).await?;
        user.mkdir("sub", 0o755).await?;
        user.creat("sub/f", 0o644).await?;
        assert_eq!(user.getcwd().await?, HOME);
        assert!(user.stat("/home/u/sub/f").await.is_ok());

        user.rename("sub/f", "g").await?;
        assert!(user.stat("g").await.is_ok());
        user.unlink("g").await?;
        user.rmdir("sub").await?;
        assert_eq!(user.stat("sub").await.unwrap_err().code(), libc::ENOENT);
        Ok(())
    })
}

#[test]
fn secure_port_requires_a_context() -> NsResult<()> {
    let server = NsTestServer::start_secure()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        user.creat("/home/u/f", 0o644).await?;
        let st = user.stat("/home/u/f").await?;
        assert_eq!((st.uid, st.gid), USER);
        Ok::<(), cns_common::error::NsError>(())
    })?;

    // A client skipping the handshake on the secure port is refused.
    let mut conf = server.client_conf();
    conf.csec_disable = true;
    conf.port = conf.secure_port;
    let mut plain = CnsSession::with_identity(conf, USER.0, USER.1);
    let err = server.block_on(plain.stat("/")).unwrap_err();
    assert_eq!(err.code(), ESEC_NO_CONTEXT);
    Ok(())
}

#[test]
fn acl_grants_a_named_user() -> NsResult<()> {
    let server = NsTestServer::start()?;
    let mut admin = server.session(ADMIN);
    let mut user = server.session(USER);
    let mut other = server.session(OTHER);

    server.block_on(async {
        setup_home(&mut admin).await?;
        user.creat("/home/u/shared", 0o600).await?;
        assert_eq!(other.access("/home/u/shared", libc::R_OK as u32).await.unwrap_err().code(), libc::EACCES);

        let acl = [
            AclEntry { a_type: CNS_ACL_USER_OBJ, a_id: 0, a_perm: 6 },
            AclEntry { a_type: CNS_ACL_USER, a_id: OTHER.0, a_perm: 4 },
            AclEntry { a_type: CNS_ACL_GROUP_OBJ, a_id: 0, a_perm: 4 },
            AclEntry { a_type: CNS_ACL_MASK, a_id: 0, a_perm: 4 },
            AclEntry { a_type: CNS_ACL_OTHER, a_id: 0, a_perm: 0 },
        ];
        user.setacl("/home/u/shared", &acl).await?;

        let (count, entries) = user.getacl("/home/u/shared", 0).await?;
        assert_eq!((count, entries.len()), (5, 0));
        let (_, entries) = user.getacl("/home/u/shared", 16).await?;
        assert!(entries.iter().any(|e| e.a_type == CNS_ACL_USER && e.a_id == OTHER.0));
        assert_eq!(user.stat("/home/u/shared").await?.filemode & 0o777, 0o640);

        other.access("/home/u/shared", libc::R_OK as u32).await?;
        assert_eq!(other.access("/home/u/shared", libc::W_OK as u32).await.unwrap_err().code(), libc::EACCES);

        // Only the owner changes the list.
        assert_eq!(other.setacl("/home/u/shared", &acl).await.unwrap_err().code(), libc::EPERM);
        Ok(())
    })
}
